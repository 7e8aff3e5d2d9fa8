//! Input resolution: validate a user-supplied file and decide its format.
//!
//! Exactly two upload types are accepted:
//!
//! | Format | MIME type |
//! |--------|-----------|
//! | PDF    | `application/pdf` |
//! | DOCX   | `application/vnd.openxmlformats-officedocument.wordprocessingml.document` |
//!
//! Anything else is rejected with [`TranslateError::UnsupportedFormat`]
//! before a session starts. DOCX passes this gate but has no extraction path:
//! the orchestrator fails it with [`TranslateError::FormatNotImplemented`].
//!
//! Local files are sniffed by magic bytes (`%PDF`, or a ZIP header plus a
//! `.docx` extension) rather than trusted by extension alone.

use crate::error::TranslateError;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The two document formats accepted at the upload boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Gate an upload by its declared MIME type.
    pub fn from_mime(name: &str, mime: &str) -> Result<Self, TranslateError> {
        match mime.trim() {
            PDF_MIME => Ok(Self::Pdf),
            DOCX_MIME => Ok(Self::Docx),
            other => Err(TranslateError::UnsupportedFormat {
                name: name.to_string(),
                mime: other.to_string(),
            }),
        }
    }

    /// Whether text extraction exists for this format.
    pub fn is_extractable(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
        })
    }
}

/// A document accepted at the upload boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFile {
    pub path: PathBuf,
    /// File name as shown to the user and used for the download name.
    pub name: String,
    pub format: DocumentFormat,
}

/// Resolve a local path to an accepted document.
///
/// Checks existence and read permission, then sniffs the format.
pub fn resolve_input(path_str: &str) -> Result<DocumentFile, TranslateError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(TranslateError::FileNotFound { path });
    }

    let mut magic = [0u8; 4];
    let read = match std::fs::File::open(&path).and_then(|mut f| f.read(&mut magic)) {
        Ok(n) => n,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TranslateError::PermissionDenied { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TranslateError::FileNotFound { path });
        }
        Err(e) => {
            return Err(TranslateError::Internal(format!(
                "Failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let name = file_name(&path);
    let mime = sniff_mime(&magic[..read], &path);
    let format = DocumentFormat::from_mime(&name, mime)?;
    debug!("Resolved {} document: {}", format, path.display());

    Ok(DocumentFile { path, name, format })
}

/// Best-effort MIME type from the first bytes and the extension.
pub fn sniff_mime(magic: &[u8], path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if magic.starts_with(b"%PDF") {
        PDF_MIME
    } else if magic.starts_with(b"PK\x03\x04") && ext.as_deref() == Some("docx") {
        DOCX_MIME
    } else if magic.starts_with(b"PK\x03\x04") {
        "application/zip"
    } else if magic.is_empty() {
        "application/x-empty"
    } else {
        "application/octet-stream"
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
