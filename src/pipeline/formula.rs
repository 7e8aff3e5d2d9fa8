//! Formula rendering: LaTeX source → MathML, or a contained failure.
//!
//! [`FormulaRenderer::render`] is the only place where markup is produced
//! from formula text. Every engine error, engine panic, and the "no engine
//! configured" case become [`FormulaRender::Failure`], so nothing raised by
//! the typesetting engine ever crosses this boundary.
//!
//! Markup returned by the engine is wrapped in [`TrustedMarkup`], which has
//! no public constructor. Text that did not come out of an engine for a given
//! formula therefore cannot reach the unescaped-HTML path of
//! [`crate::pipeline::document::to_html`].
//!
//! `pulldown-latex` copies `\text{…}` content and operator characters into
//! its output verbatim. [`MathMlEngine`] therefore swaps `<` and `>` for
//! private-use placeholders before parsing, turns them into entities
//! afterwards, and escapes any `&` that does not start an entity. Every tag
//! in the result was written by the engine.

use crate::error::RenderFailure;
use pulldown_latex::{
    config::DisplayMode, config::RenderConfig, mathml::push_mathml, Parser, Storage,
};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// A typesetting backend that turns formula source into markup.
///
/// Implementations return `Err(message)` for sources they cannot typeset.
/// They may also panic; the renderer contains it.
pub trait FormulaEngine: Send + Sync {
    /// Short engine name used in failure reports.
    fn name(&self) -> &str;

    /// Typeset `source` (delimiters already stripped).
    fn typeset(&self, source: &str, display: bool) -> Result<String, String>;
}

/// LaTeX → MathML via `pulldown-latex`. The default engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct MathMlEngine;

impl FormulaEngine for MathMlEngine {
    fn name(&self) -> &str {
        "pulldown-latex"
    }

    fn typeset(&self, source: &str, display: bool) -> Result<String, String> {
        if let Some(c) = source.chars().find(|c| placeholder_entity(*c).is_some()) {
            return Err(format!("reserved character U+{:04X} in formula", c as u32));
        }
        let shielded = shield(source);

        let storage = Storage::new();
        let parser = Parser::new(&shielded, &storage);
        let config = RenderConfig {
            display_mode: if display {
                DisplayMode::Block
            } else {
                DisplayMode::Inline
            },
            ..Default::default()
        };

        // Parse fully first so a late error does not leave half-written MathML.
        let events: Vec<_> = parser.collect();
        let errors: Vec<String> = events
            .iter()
            .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("; "));
        }

        let mut mathml = String::new();
        push_mathml(&mut mathml, events.into_iter(), config).map_err(|e| e.to_string())?;
        Ok(unshield(&mathml))
    }
}

// Placeholders for characters that would otherwise be copied into MathML raw.
// A shielded `<` typesets as an identifier rather than a relation.
const SHIELDED: [(char, char, &str); 2] = [('<', '\u{E000}', "&lt;"), ('>', '\u{E001}', "&gt;")];

fn placeholder_entity(c: char) -> Option<&'static str> {
    SHIELDED
        .iter()
        .find(|(_, placeholder, _)| *placeholder == c)
        .map(|(_, _, entity)| *entity)
}

fn shield(source: &str) -> String {
    source
        .chars()
        .map(|c| {
            SHIELDED
                .iter()
                .find(|(raw, _, _)| *raw == c)
                .map_or(c, |(_, placeholder, _)| *placeholder)
        })
        .collect()
}

/// Escape bare `&` and turn placeholders into entities.
fn unshield(mathml: &str) -> String {
    let mut out = String::with_capacity(mathml.len() + 16);
    for (i, c) in mathml.char_indices() {
        if let Some(entity) = placeholder_entity(c) {
            out.push_str(entity);
        } else if c == '&' && !starts_with_entity(&mathml[i + 1..]) {
            out.push_str("&amp;");
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether `rest` (the text after an `&`) is a character reference such as
/// `amp;`, `#8290;` or `#x2062;`.
fn starts_with_entity(rest: &str) -> bool {
    let Some(end) = rest.find(';') else {
        return false;
    };
    let body = &rest[..end];
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(dec) = body.strip_prefix('#') {
        !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
    } else {
        !body.is_empty() && body.len() <= 32 && body.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

/// Markup produced by a [`FormulaEngine`] for one formula run.
///
/// Only the renderer in this module can create it.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedMarkup(String);

impl TrustedMarkup {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TrustedMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrustedMarkup({} bytes)", self.0.len())
    }
}

/// Outcome of rendering one formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaRender {
    /// Engine output, safe to inject as markup.
    Success(TrustedMarkup),
    /// The untouched formula source plus the reason it could not be typeset.
    Failure {
        source: String,
        reason: RenderFailure,
    },
}

/// Renders formula runs with an optional engine.
///
/// A renderer without an engine is valid: every formula renders as a
/// [`FormulaRender::Failure`] with [`RenderFailure::EngineUnavailable`].
#[derive(Clone)]
pub struct FormulaRenderer {
    engine: Option<Arc<dyn FormulaEngine>>,
}

impl Default for FormulaRenderer {
    fn default() -> Self {
        Self::new(Arc::new(MathMlEngine))
    }
}

impl fmt::Debug for FormulaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaRenderer")
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl FormulaRenderer {
    pub fn new(engine: Arc<dyn FormulaEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// A renderer with no engine loaded.
    pub fn unavailable() -> Self {
        Self { engine: None }
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.engine.as_deref().map(|e| e.name())
    }

    /// Typeset one formula. Never panics, never returns an error.
    pub fn render(&self, source: &str, display: bool) -> FormulaRender {
        let Some(engine) = self.engine.as_deref() else {
            return failure(source, RenderFailure::EngineUnavailable);
        };

        match catch_unwind(AssertUnwindSafe(|| engine.typeset(source, display))) {
            Ok(Ok(markup)) => FormulaRender::Success(TrustedMarkup(markup)),
            Ok(Err(message)) => {
                debug!("{} rejected formula {:?}: {}", engine.name(), source, message);
                failure(
                    source,
                    RenderFailure::Typeset {
                        engine: engine.name().to_string(),
                        message,
                    },
                )
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                debug!("{} panicked on formula {:?}: {}", engine.name(), source, message);
                failure(
                    source,
                    RenderFailure::EnginePanicked {
                        engine: engine.name().to_string(),
                        message,
                    },
                )
            }
        }
    }
}

fn failure(source: &str, reason: RenderFailure) -> FormulaRender {
    FormulaRender::Failure {
        source: source.to_string(),
        reason,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
