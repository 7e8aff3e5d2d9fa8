//! # edgequake-scitranslate
//!
//! Translate scientific documents with an LLM while leaving every formula
//! exactly as written, then render the result as prose interleaved with
//! typeset math.
//!
//! ## Why this crate?
//!
//! Lecture notes and papers mix natural language with TeX-style math
//! (`$E=mc^2$`, `$$\int_0^1 f(x)\,dx$$`). Generic translation mangles the
//! notation. Here the translator is told to touch prose only, and the
//! renderer splits the returned text on `$`/`$$` markers so every formula is
//! typeset on its own. A formula the engine cannot handle is shown as its
//! raw source; it never takes the rest of the document down with it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / DOCX
//!  │
//!  ├─ 1. Input      accept PDF or DOCX, reject everything else
//!  ├─ 2. Extract    read the PDF text layer via pdfium (spawn_blocking)
//!  ├─ 3. Translate  one LLM call: prose only, formulas untouched
//!  ├─ 4. Segment    split on $…$ / $$…$$ into prose and formula runs
//!  ├─ 5. Typeset    LaTeX → MathML per formula, failures contained
//!  └─ 6. Output     render units, HTML, translated_<name>.txt download
//! ```
//!
//! Steps 1–3 run inside a session that moves through
//! `Idle → Extracting → Translating → Reconstructing → Complete`; see
//! [`session`] and [`orchestrator`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_scitranslate::{translate_document, FormulaRenderer, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = TranslationConfig::default();
//!     let output = translate_document("bai-giang.pdf", &config).await?;
//!     println!("{}", output.to_html(&FormulaRenderer::default()));
//!     output.write_download(".").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Rendering only
//!
//! The segment/typeset half needs no network and no pdfium:
//!
//! ```rust
//! use edgequake_scitranslate::{render_document, FormulaRenderer, RenderUnit};
//!
//! let units = render_document("Energy $E=mc^2$ is a constant.", &FormulaRenderer::default());
//! assert_eq!(units.len(), 3);
//! assert!(matches!(units[1], RenderUnit::Formula { display: false, .. }));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scitranslate` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-scitranslate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    OutputFormat, PageSelection, PageSeparator, TranslationConfig, TranslationConfigBuilder,
};
pub use error::{RenderFailure, TranslateError};
pub use orchestrator::{
    extract_document, translate_document, translate_document_sync, translate_upload, Orchestrator,
};
pub use output::{download_file_name, TranslationOutput, TranslationStats};
pub use pipeline::document::{render_document, to_html, RenderSummary, RenderUnit};
pub use pipeline::extract::{extract_text, ExtractedText, PageSource};
pub use pipeline::formula::{FormulaEngine, FormulaRender, FormulaRenderer, MathMlEngine, TrustedMarkup};
pub use pipeline::input::{resolve_input, DocumentFile, DocumentFormat, DOCX_MIME, PDF_MIME};
pub use pipeline::segment::{classify, reconstruct, Run};
pub use pipeline::translate::{LlmTranslator, Translator};
pub use progress::{NoopProgressCallback, ProgressCallback, SessionProgressCallback};
pub use session::{CancelToken, Session, SessionCoordinator, SessionEvent, SessionTicket, Stage};
