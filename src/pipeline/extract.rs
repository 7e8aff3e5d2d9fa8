//! Text extraction: paginated source → one linear text stream.
//!
//! Any paginated text source implements [`PageSource`]; [`extract_text`]
//! walks it in page order and joins the pages with a [`PageSeparator`]
//! (two newlines by default) so the last word of one page never fuses with
//! the first word of the next.
//!
//! [`extract_pdf`] is the production source: it reads the PDF text layer via
//! pdfium. Pdfium keeps thread-local state and is not safe to call from async
//! contexts, so the whole read runs inside `spawn_blocking`.

use crate::config::{PageSelection, PageSeparator, TranslationConfig};
use crate::error::TranslateError;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// An ordered, 0-indexed sequence of page texts.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Text of page `index` (0-based). Errors are plain messages; the
    /// adapter wraps them in [`TranslateError::ExtractionFailed`].
    fn page_text(&self, index: usize) -> Result<String, String>;
}

/// In-memory pages, mostly useful for tests and pre-extracted text.
impl PageSource for [String] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        self.get(index)
            .cloned()
            .ok_or_else(|| format!("no page at index {index}"))
    }
}

impl PageSource for Vec<String> {
    fn page_count(&self) -> usize {
        self.as_slice().page_count()
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        self.as_slice().page_text(index)
    }
}

/// Text extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Pages read (after page selection).
    pub page_count: usize,
}

/// Concatenate every page of `source` in order.
pub fn extract_text(
    source: &(impl PageSource + ?Sized),
    separator: &PageSeparator,
) -> Result<ExtractedText, TranslateError> {
    let indices: Vec<usize> = (0..source.page_count()).collect();
    extract_pages(source, &indices, separator, None)
}

/// Concatenate the selected pages of `source` in order.
///
/// `indices` are 0-based; separators are rendered with 1-based page numbers.
pub fn extract_pages(
    source: &(impl PageSource + ?Sized),
    indices: &[usize],
    separator: &PageSeparator,
    progress: Option<&ProgressCallback>,
) -> Result<ExtractedText, TranslateError> {
    let total = indices.len();
    let mut text = String::new();

    for (i, &idx) in indices.iter().enumerate() {
        let page_num = idx + 1;
        let page = source
            .page_text(idx)
            .map_err(|detail| TranslateError::extraction(format!("page {page_num}: {detail}")))?;
        debug!("Extracted page {} → {} chars", page_num, page.chars().count());

        if i > 0 {
            text.push_str(&separator.render(page_num));
        }
        text.push_str(&page);

        if let Some(cb) = progress {
            cb.on_page_extracted(page_num, total, page.len());
        }
    }

    if text.trim().is_empty() {
        return Err(TranslateError::extraction(
            "no text could be extracted; the document may be empty or contain only images",
        ));
    }

    Ok(ExtractedText {
        text,
        page_count: total,
    })
}

/// Extract the text layer of a PDF according to `config`.
pub async fn extract_pdf(
    pdf_path: &Path,
    config: &TranslationConfig,
) -> Result<ExtractedText, TranslateError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();
    let pages = config.pages.clone();
    let separator = config.page_separator.clone();
    let progress = config.progress_callback.clone();

    tokio::task::spawn_blocking(move || {
        extract_pdf_blocking(
            &path,
            password.as_deref(),
            &pages,
            &separator,
            progress.as_ref(),
        )
    })
    .await
    .map_err(|e| TranslateError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, TranslateError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| TranslateError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// A loaded PDF document viewed as a [`PageSource`].
pub struct PdfTextPages<'d, 'p> {
    document: &'d PdfDocument<'p>,
}

impl<'d, 'p> PdfTextPages<'d, 'p> {
    pub fn new(document: &'d PdfDocument<'p>) -> Self {
        Self { document }
    }
}

impl PageSource for PdfTextPages<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        let index = u16::try_from(index).map_err(|_| format!("page index {index} out of range"))?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| format!("{:?}", e))?;
        let text = page.text().map_err(|e| format!("{:?}", e))?;
        Ok(text.all())
    }
}

fn extract_pdf_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    pages: &PageSelection,
    separator: &PageSeparator,
    progress: Option<&ProgressCallback>,
) -> Result<ExtractedText, TranslateError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                TranslateError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                TranslateError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            TranslateError::extraction(format!("could not parse the PDF file: {err_str}"))
        }
    })?;

    let source = PdfTextPages::new(&document);
    let total_pages = source.page_count();
    info!("PDF loaded: {} pages", total_pages);

    let indices = pages.to_indices(total_pages);
    if indices.is_empty() {
        warn!("Page selection {:?} matches none of {} pages", pages, total_pages);
        return Err(TranslateError::extraction(format!(
            "page selection matches none of the document's {total_pages} pages"
        )));
    }

    extract_pages(&source, &indices, separator, progress)
}
