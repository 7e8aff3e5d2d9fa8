//! Segment classification: split text into prose and formula runs.
//!
//! The translated document is plain text in which formulas are marked with
//! TeX-style dollar delimiters:
//!
//! * `$$…$$` — display (block) math
//! * `$…$`   — inline math
//!
//! [`classify`] walks the input once, left to right, and emits an ordered
//! sequence of [`Run`]s. At every `$` two candidates are tried in priority
//! order: a double marker first, then a single marker. Spans never nest.
//!
//! ## Malformed input
//!
//! * An opening marker with no matching closer makes the rest of the input
//!   literal prose. `price is $5 and text` is one prose run.
//! * A span whose content is empty or whitespace-only (`$$ $$`, `$$$$`,
//!   `$ $`) is kept as literal prose, markers included.
//! * Adjacent prose pieces are merged, so prose-only input is one run.
//!
//! Classification is lossless: [`reconstruct`] of the runs gives back the
//! exact input. Empty input yields an empty sequence.
//!
//! Classifying two texts and concatenating the results matches classifying
//! their concatenation, provided no marker spans the join. The only
//! difference is that prose ending the first text and prose starting the
//! second come back as one merged run.

/// Opening/closing marker for display math.
pub const DISPLAY_MARKER: &str = "$$";
/// Opening/closing marker for inline math.
pub const INLINE_MARKER: &str = "$";

/// One classified piece of the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Run<'a> {
    /// Natural-language text, byte-for-byte as it appeared (newlines included).
    Prose(&'a str),
    /// Formula source with its delimiters stripped.
    Formula { source: &'a str, display: bool },
}

impl<'a> Run<'a> {
    /// The text of the run without delimiters.
    pub fn text(&self) -> &'a str {
        match *self {
            Run::Prose(text) => text,
            Run::Formula { source, .. } => source,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Run::Formula { .. })
    }

    /// Write the run back out, reinserting delimiters for formulas.
    pub fn write_source(&self, out: &mut String) {
        match *self {
            Run::Prose(text) => out.push_str(text),
            Run::Formula { source, display } => {
                let marker = marker_for(display);
                out.push_str(marker);
                out.push_str(source);
                out.push_str(marker);
            }
        }
    }
}

/// The delimiter used for a formula in the given mode.
pub fn marker_for(display: bool) -> &'static str {
    if display {
        DISPLAY_MARKER
    } else {
        INLINE_MARKER
    }
}

/// Classify `input` into prose and formula runs.
///
/// Never fails. See the module docs for the policy on malformed markers.
pub fn classify(input: &str) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let bytes = input.as_bytes();
    // Start of the prose not yet emitted.
    let mut prose_start = 0;
    let mut i = 0;

    while let Some(offset) = input[i..].find('$') {
        let open = i + offset;
        let display = bytes.get(open + 1) == Some(&b'$');
        let marker = marker_for(display);
        let content_start = open + marker.len();

        let Some(close_offset) = input[content_start..].find(marker) else {
            // Unterminated opener: everything from here on is prose.
            break;
        };
        let content_end = content_start + close_offset;
        let span_end = content_end + marker.len();
        let source = &input[content_start..content_end];

        if !source.trim().is_empty() {
            push_prose(&mut runs, &input[prose_start..open]);
            runs.push(Run::Formula { source, display });
            prose_start = span_end;
        }
        // Blank spans stay inside the pending prose, markers included.
        i = span_end;
    }

    push_prose(&mut runs, &input[prose_start..]);
    runs
}

/// Rebuild the original text from a run sequence.
pub fn reconstruct(runs: &[Run<'_>]) -> String {
    let capacity = runs.iter().map(|r| r.text().len() + 4).sum();
    let mut out = String::with_capacity(capacity);
    for run in runs {
        run.write_source(&mut out);
    }
    out
}

/// Number of formula runs in `input`, split into (inline, display).
pub fn count_formulas(input: &str) -> (usize, usize) {
    classify(input)
        .iter()
        .fold((0, 0), |(inline, display), run| match run {
            Run::Formula { display: true, .. } => (inline, display + 1),
            Run::Formula { display: false, .. } => (inline + 1, display),
            Run::Prose(_) => (inline, display),
        })
}

fn push_prose<'a>(runs: &mut Vec<Run<'a>>, text: &'a str) {
    if !text.is_empty() {
        runs.push(Run::Prose(text));
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
