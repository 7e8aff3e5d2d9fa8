//! Session orchestration: drive one document through the stage sequence.
//!
//! ```text
//! select_file ─▶ Extracting ─▶ Translating ─▶ Reconstructing ─▶ Complete
//!                  extract        translate      fixed delay
//! ```
//!
//! Every stage change goes through the [`SessionCoordinator`], tagged with
//! the run's [`SessionTicket`]. After each await the run checks its cancel
//! token; a run whose session was superseded stops with
//! [`TranslateError::Cancelled`] and writes nothing.
//!
//! On any other error the session drops back to `Idle` with the error
//! message recorded, and [`SessionProgressCallback::on_session_error`] fires.
//!
//! [`SessionProgressCallback::on_session_error`]: crate::progress::SessionProgressCallback::on_session_error

use crate::config::TranslationConfig;
use crate::error::TranslateError;
use crate::output::{TranslationOutput, TranslationStats};
use crate::pipeline::extract::{extract_pages, extract_pdf, ExtractedText};
use crate::pipeline::input::{resolve_input, DocumentFile, DocumentFormat};
use crate::pipeline::segment::count_formulas;
use crate::pipeline::translate::resolve_translator;
use crate::session::{Session, SessionCoordinator, SessionEvent, SessionTicket, Stage};
use std::future::Future;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Owns the current session and runs documents through the pipeline.
///
/// Cheap to share behind an `Arc`; the lock is never held across an await.
#[derive(Debug, Default)]
pub struct Orchestrator {
    coordinator: Mutex<SessionCoordinator>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.lock().session().clone()
    }

    /// Make `file_name` the current document, cancelling any run in flight.
    pub fn select_file(&self, file_name: &str, config: &TranslationConfig) -> SessionTicket {
        let ticket = self.lock().select_file(file_name);
        info!("Session {}: selected '{}'", ticket.id, file_name);
        if let Some(ref cb) = config.progress_callback {
            cb.on_session_start(ticket.id, file_name);
        }
        ticket
    }

    /// Run a resolved document through the pipeline.
    ///
    /// Only PDF has an extraction path; DOCX fails the session with
    /// [`TranslateError::FormatNotImplemented`] before any stage is entered.
    pub async fn run(
        &self,
        ticket: &SessionTicket,
        document: &DocumentFile,
        config: &TranslationConfig,
    ) -> Result<TranslationOutput, TranslateError> {
        if !document.format.is_extractable() {
            let err = TranslateError::FormatNotImplemented {
                format: document.format.to_string(),
            };
            self.fail(ticket, &err, config);
            return Err(err);
        }

        let path = document.path.clone();
        self.drive(ticket, &document.name, config, async move {
            extract_pdf(&path, config).await
        })
        .await
    }

    /// Run pre-extracted page texts through the pipeline.
    ///
    /// Page selection and separators from `config` apply as for a PDF.
    pub async fn run_pages(
        &self,
        ticket: &SessionTicket,
        file_name: &str,
        pages: &[String],
        config: &TranslationConfig,
    ) -> Result<TranslationOutput, TranslateError> {
        self.drive(ticket, file_name, config, async move {
            let indices = config.pages.to_indices(pages.len());
            extract_pages(
                pages,
                &indices,
                &config.page_separator,
                config.progress_callback.as_ref(),
            )
        })
        .await
    }

    async fn drive<F>(
        &self,
        ticket: &SessionTicket,
        file_name: &str,
        config: &TranslationConfig,
        extraction: F,
    ) -> Result<TranslationOutput, TranslateError>
    where
        F: Future<Output = Result<ExtractedText, TranslateError>>,
    {
        let result = self.stages(ticket, file_name, config, extraction).await;
        if let Err(ref e) = result {
            if e.is_cancelled() {
                debug!("Session {} stopped after cancellation", ticket.id);
            } else {
                self.fail(ticket, e, config);
            }
        }
        result
    }

    async fn stages<F>(
        &self,
        ticket: &SessionTicket,
        file_name: &str,
        config: &TranslationConfig,
        extraction: F,
    ) -> Result<TranslationOutput, TranslateError>
    where
        F: Future<Output = Result<ExtractedText, TranslateError>>,
    {
        let total_start = Instant::now();

        // ── Extracting ───────────────────────────────────────────────────
        self.enter(ticket, Stage::Extracting, config)?;
        let extract_start = Instant::now();
        let extracted = extraction.await;
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        // A superseded run reports cancellation even if its await also failed.
        self.check(ticket)?;
        let extracted = extracted?;
        info!(
            "Session {}: extracted {} chars from {} pages in {}ms",
            ticket.id,
            extracted.text.chars().count(),
            extracted.page_count,
            extract_duration_ms
        );

        // ── Translating ──────────────────────────────────────────────────
        self.enter(ticket, Stage::Translating, config)?;
        let translator = resolve_translator(config)?;
        let translate_start = Instant::now();
        let translated = translator.translate(&extracted.text).await;
        let translate_duration_ms = translate_start.elapsed().as_millis() as u64;
        self.check(ticket)?;
        let translated = translated?;
        if translated.trim().is_empty() {
            return Err(TranslateError::translation(
                "the translator returned an empty result",
            ));
        }
        self.dispatch(ticket, SessionEvent::Translated(translated.clone()))?;
        info!(
            "Session {}: translated in {}ms",
            ticket.id, translate_duration_ms
        );

        // ── Reconstructing ───────────────────────────────────────────────
        self.enter(ticket, Stage::Reconstructing, config)?;
        if config.reconstruct_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.reconstruct_delay_ms)).await;
        }
        self.check(ticket)?;

        self.enter(ticket, Stage::Complete, config)?;

        let (inline_formulas, display_formulas) = count_formulas(&translated);
        let stats = TranslationStats {
            pages: extracted.page_count,
            source_chars: extracted.text.chars().count(),
            translated_chars: translated.chars().count(),
            inline_formulas,
            display_formulas,
            extract_duration_ms,
            translate_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Session {}: complete, {} formulas, {}ms total",
            ticket.id,
            inline_formulas + display_formulas,
            stats.total_duration_ms
        );

        Ok(TranslationOutput {
            session_id: ticket.id,
            file_name: file_name.to_string(),
            source_text: extracted.text,
            translated_text: translated,
            output_format: config.output_format,
            stats,
        })
    }

    fn enter(
        &self,
        ticket: &SessionTicket,
        stage: Stage,
        config: &TranslationConfig,
    ) -> Result<(), TranslateError> {
        self.dispatch(ticket, SessionEvent::StageEntered(stage))?;
        if self.lock().session().stage != stage {
            return Err(TranslateError::Internal(format!(
                "session {} could not enter stage {:?}",
                ticket.id, stage
            )));
        }
        info!("Session {}: {}", ticket.id, stage.label());
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(ticket.id, stage);
        }
        Ok(())
    }

    fn dispatch(&self, ticket: &SessionTicket, event: SessionEvent) -> Result<(), TranslateError> {
        if self.lock().dispatch(ticket, event) {
            Ok(())
        } else {
            Err(TranslateError::Cancelled { session: ticket.id })
        }
    }

    fn check(&self, ticket: &SessionTicket) -> Result<(), TranslateError> {
        if ticket.is_cancelled() {
            Err(TranslateError::Cancelled { session: ticket.id })
        } else {
            Ok(())
        }
    }

    fn fail(&self, ticket: &SessionTicket, error: &TranslateError, config: &TranslationConfig) {
        let message = error.to_string();
        if !self.lock().dispatch(ticket, SessionEvent::Failed(message.clone())) {
            return;
        }
        warn!("Session {} failed: {}", ticket.id, message);
        if let Some(ref cb) = config.progress_callback {
            cb.on_session_error(ticket.id, &message);
            cb.on_stage(ticket.id, Stage::Idle);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionCoordinator> {
        // Mutations replace the whole session value, so a poisoned lock is still consistent.
        self.coordinator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Translate the document at `input` in a fresh session.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Input errors (`FileNotFound`, `UnsupportedFormat`, …) are returned before
/// a session starts. Everything after that is a session failure.
pub async fn translate_document(
    input: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let input = input.as_ref();
    let document = resolve_input(input)?;
    let orchestrator = Orchestrator::new();
    let ticket = orchestrator.select_file(&document.name, config);
    orchestrator.run(&ticket, &document, config).await
}

/// Translate an uploaded document held in memory.
///
/// `mime` is the type declared by the uploader and is gated exactly like
/// a local file's sniffed type. The bytes go to a managed [`tempfile`] that
/// is removed on return or panic.
pub async fn translate_upload(
    file_name: &str,
    mime: &str,
    bytes: &[u8],
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let format = DocumentFormat::from_mime(file_name, mime)?;

    let mut tmp = tempfile::Builder::new()
        .prefix("scitranslate-")
        .suffix(".upload")
        .tempfile()
        .map_err(|e| TranslateError::Internal(format!("Failed to create temp file: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| TranslateError::Internal(format!("Failed to buffer upload: {e}")))?;

    let document = DocumentFile {
        path: tmp.path().to_path_buf(),
        name: file_name.to_string(),
        format,
    };
    let orchestrator = Orchestrator::new();
    let ticket = orchestrator.select_file(&document.name, config);
    orchestrator.run(&ticket, &document, config).await
}

/// Synchronous wrapper around [`translate_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_document_sync(
    input: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_document(input, config))
}

/// Extract a document's text without translating it.
///
/// Does not require an LLM provider or API key.
pub async fn extract_document(
    input: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<ExtractedText, TranslateError> {
    let document = resolve_input(input.as_ref())?;
    if !document.format.is_extractable() {
        return Err(TranslateError::FormatNotImplemented {
            format: document.format.to_string(),
        });
    }
    extract_pdf(&document.path, config).await
}
