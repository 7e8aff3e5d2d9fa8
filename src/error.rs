//! Error types for the edgequake-scitranslate library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TranslateError`] — **Fatal**: the session cannot continue (unreadable
//!   PDF, no extractable text, translation call failed). Returned as
//!   `Err(TranslateError)` from the orchestrator and recorded as the session
//!   error message; the session stage drops back to `Idle`.
//!
//! * [`RenderFailure`] — **Non-fatal**: one formula could not be typeset.
//!   Stored inside [`crate::pipeline::document::RenderUnit::FormulaError`] so
//!   the rest of the document still renders.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-scitranslate library.
///
/// Formula-level failures use [`RenderFailure`] and never propagate here.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file type is not one of the two accepted upload types.
    #[error("Unsupported file '{name}' ({mime})\nPlease provide a PDF or Word (.docx) document.")]
    UnsupportedFormat { name: String, mime: String },

    /// The file type is accepted at the boundary but has no extraction path yet.
    #[error("{format} translation is not yet implemented; only PDF documents can be translated.")]
    FormatNotImplemented { format: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The page source could not produce text, or produced none at all.
    #[error("Text extraction failed: {detail}")]
    ExtractionFailed { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Translation errors ────────────────────────────────────────────────
    /// The translator returned an error or an unusable response.
    #[error("Translation failed: {detail}")]
    TranslationFailed { detail: String },

    /// The translation call exceeded the configured timeout.
    #[error("Translation timed out after {secs}s\nIncrease --api-timeout.")]
    TranslationTimeout { secs: u64 },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// The session was superseded by a newer one before it finished.
    #[error("Session {session} was cancelled: a newer document was selected")]
    Cancelled { session: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// Shorthand for an [`TranslateError::ExtractionFailed`] with a message.
    pub fn extraction(detail: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            detail: detail.into(),
        }
    }

    /// Shorthand for a [`TranslateError::TranslationFailed`] with a message.
    pub fn translation(detail: impl Into<String>) -> Self {
        Self::TranslationFailed {
            detail: detail.into(),
        }
    }

    /// True when the error was raised because the session was superseded.
    ///
    /// Cancelled sessions are not reported to the user: a newer session
    /// already owns the visible state.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A non-fatal error for a single formula run.
///
/// Stored alongside the untouched formula source so the presentation layer
/// can show the raw markers instead of an empty node.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderFailure {
    /// No typesetting engine is configured.
    #[error("math engine unavailable")]
    EngineUnavailable,

    /// The engine rejected the formula source.
    #[error("{engine}: {message}")]
    Typeset { engine: String, message: String },

    /// The engine panicked while typesetting; the panic was contained.
    #[error("{engine} panicked: {message}")]
    EnginePanicked { engine: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = TranslateError::UnsupportedFormat {
            name: "notes.txt".into(),
            mime: "text/plain".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.txt"), "got: {msg}");
        assert!(msg.contains("text/plain"), "got: {msg}");
    }

    #[test]
    fn not_implemented_mentions_format() {
        let e = TranslateError::FormatNotImplemented {
            format: "DOCX".into(),
        };
        assert!(e.to_string().starts_with("DOCX translation is not yet implemented"));
    }

    #[test]
    fn translation_timeout_display() {
        let e = TranslateError::TranslationTimeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn cancelled_is_flagged() {
        assert!(TranslateError::Cancelled { session: 3 }.is_cancelled());
        assert!(!TranslateError::extraction("empty").is_cancelled());
    }

    #[test]
    fn render_failure_display() {
        let f = RenderFailure::Typeset {
            engine: "pulldown-latex".into(),
            message: "unbalanced group".into(),
        };
        assert_eq!(f.to_string(), "pulldown-latex: unbalanced group");
        assert_eq!(RenderFailure::EngineUnavailable.to_string(), "math engine unavailable");
    }
}
