//! Result types for a finished translation session.

use crate::config::OutputFormat;
use crate::error::TranslateError;
use crate::pipeline::document::{render_document, to_html, to_html_page, RenderSummary, RenderUnit};
use crate::pipeline::formula::FormulaRenderer;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything a completed session produced.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutput {
    pub session_id: u64,
    /// Name of the document the user selected.
    pub file_name: String,
    /// Text extracted from the document, before translation.
    pub source_text: String,
    /// Translated text with formula markers intact.
    pub translated_text: String,
    /// Requested output format. Only changes the displayed label.
    pub output_format: OutputFormat,
    pub stats: TranslationStats,
}

/// Timing and size figures for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranslationStats {
    pub pages: usize,
    pub source_chars: usize,
    pub translated_chars: usize,
    pub inline_formulas: usize,
    pub display_formulas: usize,
    pub extract_duration_ms: u64,
    pub translate_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl TranslationOutput {
    /// Render units for the translated text, derived fresh on every call.
    pub fn render(&self, renderer: &FormulaRenderer) -> Vec<RenderUnit> {
        render_document(&self.translated_text, renderer)
    }

    /// Counts of prose runs, formulas and formula failures.
    pub fn summary(&self, renderer: &FormulaRenderer) -> RenderSummary {
        RenderSummary::of(&self.render(renderer))
    }

    /// HTML fragment of the translated document.
    pub fn to_html(&self, renderer: &FormulaRenderer) -> String {
        to_html(&self.render(renderer))
    }

    /// Standalone HTML page titled after the source document.
    pub fn to_html_page(&self, renderer: &FormulaRenderer) -> String {
        let title = format!("Translated: {}", self.file_name);
        to_html_page(&title, &self.render(renderer))
    }

    /// File name offered for the raw-text download.
    pub fn download_name(&self) -> String {
        download_file_name(&self.file_name)
    }

    /// Write the raw translated text into `dir` under [`Self::download_name`].
    ///
    /// Returns the written path.
    pub async fn write_download(&self, dir: impl AsRef<Path>) -> Result<PathBuf, TranslateError> {
        let path = dir.as_ref().join(self.download_name());
        write_atomic(&path, &self.translated_text).await?;
        Ok(path)
    }
}

/// `translated_<stem>.txt`, where `stem` is `name` without its last
/// extension, or `document` when that leaves nothing.
pub fn download_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match base.rfind('.') {
        Some(dot) => &base[..dot],
        None => "",
    };
    let stem = if stem.is_empty() { "document" } else { stem };
    format!("translated_{stem}.txt")
}

/// Write `contents` to `path` via a temp file and rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), TranslateError> {
    let write_err = |e| TranslateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
