//! Document rendering: classified runs → ordered render units → HTML.
//!
//! [`render_document`] classifies the translated text, typesets each formula
//! run and returns one [`RenderUnit`] per run in input order. A formula that
//! fails to typeset becomes a [`RenderUnit::FormulaError`]; its neighbours are
//! unaffected.
//!
//! [`to_html`] turns the units into an HTML fragment. Prose is escaped and
//! wrapped in a `white-space: pre-wrap` span so the paragraph breaks the
//! translator reintroduces stay visible. Only [`TrustedMarkup`] is written
//! unescaped.

use crate::error::RenderFailure;
use crate::pipeline::formula::{FormulaRender, FormulaRenderer, TrustedMarkup};
use crate::pipeline::segment::{classify, marker_for, Run};
use pulldown_cmark_escape::{escape_html, escape_html_body_text};
use serde::Serialize;

/// One displayable piece of a rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderUnit {
    /// Prose, shown verbatim with whitespace preserved.
    Text { text: String },
    /// A typeset formula.
    Formula { display: bool, markup: TrustedMarkup },
    /// A formula that could not be typeset, shown as its original source.
    FormulaError {
        display: bool,
        source: String,
        reason: RenderFailure,
    },
}

impl RenderUnit {
    /// The formula source with its delimiters, for error tokens.
    ///
    /// `None` for everything except [`RenderUnit::FormulaError`].
    pub fn delimited_source(&self) -> Option<String> {
        match self {
            RenderUnit::FormulaError {
                display, source, ..
            } => {
                let marker = marker_for(*display);
                Some(format!("{marker}{source}{marker}"))
            }
            _ => None,
        }
    }
}

/// Counts gathered while rendering a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub prose_runs: usize,
    pub inline_formulas: usize,
    pub display_formulas: usize,
    pub failed_formulas: usize,
}

impl RenderSummary {
    pub fn of(units: &[RenderUnit]) -> Self {
        units.iter().fold(Self::default(), |mut s, unit| {
            match unit {
                RenderUnit::Text { .. } => s.prose_runs += 1,
                RenderUnit::Formula { display, .. } | RenderUnit::FormulaError { display, .. } => {
                    if *display {
                        s.display_formulas += 1;
                    } else {
                        s.inline_formulas += 1;
                    }
                    if matches!(unit, RenderUnit::FormulaError { .. }) {
                        s.failed_formulas += 1;
                    }
                }
            }
            s
        })
    }

    pub fn formulas(&self) -> usize {
        self.inline_formulas + self.display_formulas
    }
}

/// Render `text` into an ordered sequence of units.
pub fn render_document(text: &str, renderer: &FormulaRenderer) -> Vec<RenderUnit> {
    classify(text)
        .into_iter()
        .map(|run| render_run(run, renderer))
        .collect()
}

fn render_run(run: Run<'_>, renderer: &FormulaRenderer) -> RenderUnit {
    match run {
        Run::Prose(text) => RenderUnit::Text {
            text: text.to_string(),
        },
        Run::Formula { source, display } => match renderer.render(source, display) {
            FormulaRender::Success(markup) => RenderUnit::Formula { display, markup },
            FormulaRender::Failure { source, reason } => RenderUnit::FormulaError {
                display,
                source,
                reason,
            },
        },
    }
}

/// Compose render units into an HTML fragment.
pub fn to_html(units: &[RenderUnit]) -> String {
    let mut html = String::new();
    for unit in units {
        // Writing into a String cannot fail.
        match unit {
            RenderUnit::Text { text } => {
                html.push_str(r#"<span style="white-space: pre-wrap">"#);
                let _ = escape_html_body_text(&mut html, text);
                html.push_str("</span>");
            }
            RenderUnit::Formula { display, markup } => {
                html.push_str(&format!(r#"<span class="math {}">"#, mode_class(*display)));
                html.push_str(markup.as_str());
                html.push_str("</span>");
            }
            RenderUnit::FormulaError {
                display, reason, ..
            } => {
                let source = unit.delimited_source().unwrap_or_default();
                html.push_str(&format!(
                    r#"<code class="math math-error {}" title=""#,
                    mode_class(*display)
                ));
                let _ = escape_html(&mut html, &reason.to_string());
                html.push_str(r#"">"#);
                let _ = escape_html_body_text(&mut html, &source);
                html.push_str("</code>");
            }
        }
    }
    html
}

/// Wrap [`to_html`] output in a minimal standalone page.
pub fn to_html_page(title: &str, units: &[RenderUnit]) -> String {
    let mut escaped_title = String::new();
    let _ = escape_html_body_text(&mut escaped_title, title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{escaped_title}</title>\n\
<style>\nbody {{ font-family: Georgia, \"Times New Roman\", Times, serif; line-height: 1.6; max-width: 8.5in; margin: 2em auto; }}\n\
.math-error {{ color: #b91c1c; background: #fee2e2; padding: 0 0.25em; }}\n</style>\n\
</head>\n<body>\n{}\n</body>\n</html>\n",
        to_html(units)
    )
}

fn mode_class(display: bool) -> &'static str {
    if display {
        "math-display"
    } else {
        "math-inline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::formula::FormulaEngine;
    use std::sync::Arc;

    /// Fails on any source containing `\fail`, succeeds otherwise.
    struct SelectiveEngine;

    impl FormulaEngine for SelectiveEngine {
        fn name(&self) -> &str {
            "selective"
        }

        fn typeset(&self, source: &str, display: bool) -> Result<String, String> {
            if source.contains(r"\fail") {
                panic!("engine blew up");
            }
            Ok(format!("<math display=\"{display}\">{source}</math>"))
        }
    }

    fn text(t: &str) -> RenderUnit {
        RenderUnit::Text { text: t.into() }
    }

    #[test]
    fn renders_three_units_in_order() {
        let units = render_document("Energy $E=mc^2$ is a constant.", &FormulaRenderer::default());
        assert_eq!(units.len(), 3);
        assert_eq!(units[0], text("Energy "));
        assert!(matches!(units[1], RenderUnit::Formula { display: false, .. }));
        assert_eq!(units[2], text(" is a constant."));
    }

    #[test]
    fn failing_formula_does_not_affect_siblings() {
        let renderer = FormulaRenderer::new(Arc::new(SelectiveEngine));
        let units = render_document("a $x$ b $$\\fail$$ c $y$", &renderer);

        assert_eq!(units.len(), 6);
        assert!(matches!(units[1], RenderUnit::Formula { display: false, .. }));
        assert_eq!(
            units[3],
            RenderUnit::FormulaError {
                display: true,
                source: r"\fail".into(),
                reason: RenderFailure::EnginePanicked {
                    engine: "selective".into(),
                    message: "engine blew up".into(),
                },
            }
        );
        assert!(matches!(units[5], RenderUnit::Formula { display: false, .. }));

        let summary = RenderSummary::of(&units);
        assert_eq!(summary.formulas(), 3);
        assert_eq!(summary.failed_formulas, 1);
        assert_eq!(summary.prose_runs, 3);
    }

    #[test]
    fn unavailable_engine_downgrades_every_formula() {
        let units = render_document("$a$ and $$b$$", &FormulaRenderer::unavailable());
        assert_eq!(RenderSummary::of(&units).failed_formulas, 2);
        assert_eq!(units[2].delimited_source().as_deref(), Some("$$b$$"));
    }

    #[test]
    fn html_preserves_newlines_and_escapes_prose() {
        let units = vec![text("line <1>\nline 2")];
        let html = to_html(&units);
        assert_eq!(
            html,
            "<span style=\"white-space: pre-wrap\">line &lt;1&gt;\nline 2</span>"
        );
    }

    #[test]
    fn html_error_token_shows_escaped_source() {
        let units = render_document("$<script>\\fail$", &FormulaRenderer::new(Arc::new(SelectiveEngine)));
        let html = to_html(&units);
        assert!(html.contains("math-error math-inline"));
        assert!(html.contains("$&lt;script&gt;\\fail$"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn html_from_typeset_formulas_carries_no_source_tags() {
        let renderer = FormulaRenderer::default();
        let html = to_html(&render_document(
            r"Energy $\text{<img src=x onerror=alert(1)>}$ end",
            &renderer,
        ));
        assert!(html.contains("<math"), "got: {html}");
        assert!(!html.contains("<img"), "got: {html}");

        let html = to_html(&render_document("$a<b$", &renderer));
        assert!(html.contains("&lt;"), "got: {html}");
        assert!(!html.contains("<b"), "got: {html}");
    }

    #[test]
    fn html_injects_engine_markup() {
        let units = render_document("$$x$$", &FormulaRenderer::new(Arc::new(SelectiveEngine)));
        assert_eq!(
            to_html(&units),
            "<span class=\"math math-display\"><math display=\"true\">x</math></span>"
        );
    }

    #[test]
    fn html_page_escapes_title() {
        let page = to_html_page("a & b", &[text("hi")]);
        assert!(page.contains("<title>a &amp; b</title>"));
        assert!(page.contains("hi</span>"));
    }
}
