//! Offline integration tests for the translation pipeline.
//!
//! Every test drives the real orchestrator with in-memory pages and stub
//! translators, so no network access and no pdfium library are needed.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_scitranslate::{
    render_document, resolve_input, translate_upload, DocumentFormat, FormulaRenderer,
    Orchestrator, PageSelection, RenderUnit, SessionProgressCallback, Stage, TranslateError,
    TranslationConfig, Translator, DOCX_MIME,
};
use futures::future::BoxFuture;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("edgequake_scitranslate=debug")
        .with_test_writer()
        .try_init();
}

/// Returns a fixed reply and counts calls.
struct FixedTranslator {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

impl FixedTranslator {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

impl Translator for FixedTranslator {
    fn translate<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<String, TranslateError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.clone().map_err(TranslateError::translation);
        Box::pin(async move { reply })
    }
}

/// Returns its input unchanged.
struct EchoTranslator;

impl Translator for EchoTranslator {
    fn translate<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, TranslateError>> {
        Box::pin(async move { Ok(text.to_string()) })
    }
}

/// Signals when it starts, then waits until released.
struct GatedTranslator {
    started: Arc<Notify>,
    release: Arc<Notify>,
    fail: bool,
}

impl Translator for GatedTranslator {
    fn translate<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, TranslateError>> {
        Box::pin(async move {
            self.started.notify_one();
            self.release.notified().await;
            if self.fail {
                return Err(TranslateError::translation("connection reset"));
            }
            Ok(text.to_uppercase())
        })
    }
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<(u64, Stage)>>,
    errors: Mutex<Vec<(u64, String)>>,
    pages: AtomicUsize,
}

impl Recorder {
    fn stages(&self) -> Vec<Stage> {
        self.stages.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }
}

impl SessionProgressCallback for Recorder {
    fn on_stage(&self, session: u64, stage: Stage) {
        self.stages.lock().unwrap().push((session, stage));
    }

    fn on_page_extracted(&self, _page_num: usize, _total_pages: usize, _text_len: usize) {
        self.pages.fetch_add(1, Ordering::SeqCst);
    }

    fn on_session_error(&self, session: u64, error: &str) {
        self.errors.lock().unwrap().push((session, error.to_string()));
    }
}

fn config_with(translator: Arc<dyn Translator>, recorder: &Arc<Recorder>) -> TranslationConfig {
    TranslationConfig::builder()
        .translator(translator)
        .reconstruct_delay_ms(0)
        .progress_callback(recorder.clone() as Arc<dyn SessionProgressCallback>)
        .build()
        .unwrap()
}

fn pages(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn vietnamese_lecture_translates_and_renders() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    let translator = FixedTranslator::ok("Energy $E=mc^2$ is a constant.");
    let config = config_with(translator.clone(), &recorder);

    let orch = Orchestrator::new();
    let ticket = orch.select_file("bai-giang.pdf", &config);
    let output = orch
        .run_pages(
            &ticket,
            "bai-giang.pdf",
            &pages(&["Năng lượng $E=mc^2$ là một hằng số."]),
            &config,
        )
        .await
        .unwrap();

    assert_eq!(
        recorder.stages(),
        vec![
            Stage::Extracting,
            Stage::Translating,
            Stage::Reconstructing,
            Stage::Complete
        ]
    );
    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);

    let session = orch.session();
    assert_eq!(session.stage, Stage::Complete);
    assert_eq!(
        session.translated_text.as_deref(),
        Some("Energy $E=mc^2$ is a constant.")
    );
    assert!(session.error.is_none());

    assert_eq!(output.source_text, "Năng lượng $E=mc^2$ là một hằng số.");
    assert_eq!(output.stats.inline_formulas, 1);
    assert_eq!(output.stats.display_formulas, 0);
    assert_eq!(output.download_name(), "translated_bai-giang.txt");

    let units = output.render(&FormulaRenderer::default());
    assert_eq!(units.len(), 3);
    assert_eq!(
        units[0],
        RenderUnit::Text {
            text: "Energy ".into()
        }
    );
    assert!(matches!(units[1], RenderUnit::Formula { display: false, .. }));
    assert_eq!(
        units[2],
        RenderUnit::Text {
            text: " is a constant.".into()
        }
    );

    let html = output.to_html(&FormulaRenderer::default());
    assert!(html.contains("<math"), "got: {html}");
    assert!(html.contains("Energy "));
}

#[tokio::test]
async fn three_pages_join_with_blank_lines() {
    let recorder = Arc::new(Recorder::default());
    let config = config_with(Arc::new(EchoTranslator), &recorder);

    let orch = Orchestrator::new();
    let ticket = orch.select_file("abc.pdf", &config);
    let output = orch
        .run_pages(&ticket, "abc.pdf", &pages(&["A", "B", "C"]), &config)
        .await
        .unwrap();

    assert_eq!(output.source_text, "A\n\nB\n\nC");
    assert_eq!(output.translated_text, "A\n\nB\n\nC");
    assert_eq!(output.stats.pages, 3);
    assert_eq!(recorder.pages.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn page_selection_applies_to_in_memory_pages() {
    let recorder = Arc::new(Recorder::default());
    let mut config = config_with(Arc::new(EchoTranslator), &recorder);
    config.pages = PageSelection::Range(2, 3);

    let orch = Orchestrator::new();
    let ticket = orch.select_file("abc.pdf", &config);
    let output = orch
        .run_pages(&ticket, "abc.pdf", &pages(&["A", "B", "C"]), &config)
        .await
        .unwrap();

    assert_eq!(output.translated_text, "B\n\nC");
    assert_eq!(output.stats.pages, 2);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn translation_failure_returns_to_idle_with_message() {
    init_logging();
    let recorder = Arc::new(Recorder::default());
    let config = config_with(FixedTranslator::failing("quota exceeded"), &recorder);

    let orch = Orchestrator::new();
    let ticket = orch.select_file("bai-giang.pdf", &config);
    let err = orch
        .run_pages(&ticket, "bai-giang.pdf", &pages(&["Xin chào"]), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::TranslationFailed { .. }));
    assert_eq!(
        recorder.stages(),
        vec![Stage::Extracting, Stage::Translating, Stage::Idle]
    );

    let session = orch.session();
    assert_eq!(session.stage, Stage::Idle);
    assert!(session.translated_text.is_none());
    let message = session.error.unwrap();
    assert!(message.contains("quota exceeded"), "got: {message}");

    let errors = recorder.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, ticket.id);
}

#[tokio::test]
async fn empty_extraction_never_reaches_the_translator() {
    let recorder = Arc::new(Recorder::default());
    let translator = FixedTranslator::ok("unused");
    let config = config_with(translator.clone(), &recorder);

    let orch = Orchestrator::new();
    let ticket = orch.select_file("scan.pdf", &config);
    let err = orch
        .run_pages(&ticket, "scan.pdf", &pages(&["  ", "\n"]), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::ExtractionFailed { .. }));
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.stages(), vec![Stage::Extracting, Stage::Idle]);
    assert_eq!(orch.session().stage, Stage::Idle);
    assert!(orch.session().error.is_some());
}

#[tokio::test]
async fn whitespace_translation_is_a_failure() {
    let recorder = Arc::new(Recorder::default());
    let config = config_with(FixedTranslator::ok(" \n "), &recorder);

    let orch = Orchestrator::new();
    let ticket = orch.select_file("a.pdf", &config);
    let err = orch
        .run_pages(&ticket, "a.pdf", &pages(&["text"]), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::TranslationFailed { .. }));
    assert_eq!(orch.session().stage, Stage::Idle);
}

#[tokio::test]
async fn docx_is_accepted_then_rejected_downstream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thesis.docx");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"PK\x03\x04word/document.xml")
        .unwrap();

    let document = resolve_input(path.to_str().unwrap()).unwrap();
    assert_eq!(document.format, DocumentFormat::Docx);

    let recorder = Arc::new(Recorder::default());
    let translator = FixedTranslator::ok("unused");
    let config = config_with(translator.clone(), &recorder);

    let orch = Orchestrator::new();
    let ticket = orch.select_file(&document.name, &config);
    let err = orch.run(&ticket, &document, &config).await.unwrap_err();

    assert!(matches!(err, TranslateError::FormatNotImplemented { .. }));
    assert_eq!(recorder.stages(), vec![Stage::Idle]);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);

    let session = orch.session();
    assert_eq!(session.stage, Stage::Idle);
    assert!(session.error.unwrap().contains("DOCX"));
}

#[test]
fn unsupported_file_is_rejected_before_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "plain notes").unwrap();

    let err = resolve_input(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, TranslateError::UnsupportedFormat { .. }));
}

#[tokio::test]
async fn uploads_are_gated_by_declared_mime() {
    let recorder = Arc::new(Recorder::default());
    let config = config_with(FixedTranslator::ok("unused"), &recorder);

    let err = translate_upload("photo.png", "image/png", b"\x89PNG", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::UnsupportedFormat { .. }));
    assert!(recorder.stages().is_empty());

    let err = translate_upload("Luận văn.docx", DOCX_MIME, b"PK\x03\x04", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::FormatNotImplemented { .. }));
    assert_eq!(recorder.stages(), vec![Stage::Idle]);
}

// ── Superseded sessions ──────────────────────────────────────────────────────

#[tokio::test]
async fn stale_session_cannot_overwrite_the_new_one() {
    init_logging();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let recorder = Arc::new(Recorder::default());
    let gated = Arc::new(GatedTranslator {
        started: started.clone(),
        release: release.clone(),
        fail: false,
    });
    let config = config_with(gated, &recorder);

    let orch = Orchestrator::new();
    let first = orch.select_file("old.pdf", &config);
    let first_pages = pages(&["cũ"]);

    let run = orch.run_pages(&first, "old.pdf", &first_pages, &config);
    let supersede = async {
        started.notified().await;
        let second = orch.select_file("new.pdf", &config);
        release.notify_one();
        second
    };
    let (result, second) = tokio::join!(run, supersede);

    match result {
        Err(TranslateError::Cancelled { session }) => assert_eq!(session, first.id),
        other => panic!("expected cancellation, got {other:?}"),
    }

    let session = orch.session();
    assert_eq!(session.id, second.id);
    assert_eq!(session.file_name.as_deref(), Some("new.pdf"));
    assert_eq!(session.stage, Stage::Idle);
    assert!(session.translated_text.is_none());
    assert!(session.error.is_none());
    assert!(recorder.errors.lock().unwrap().is_empty());

    // The new session still runs to completion.
    let echo = config_with(Arc::new(EchoTranslator), &recorder);
    let output = orch
        .run_pages(&second, "new.pdf", &pages(&["mới"]), &echo)
        .await
        .unwrap();
    assert_eq!(output.session_id, second.id);
    assert_eq!(orch.session().stage, Stage::Complete);
}

#[tokio::test]
async fn superseded_run_reports_cancellation_even_if_translation_fails() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let recorder = Arc::new(Recorder::default());
    let gated = Arc::new(GatedTranslator {
        started: started.clone(),
        release: release.clone(),
        fail: true,
    });
    let config = config_with(gated, &recorder);

    let orch = Orchestrator::new();
    let first = orch.select_file("old.pdf", &config);
    let first_pages = pages(&["cũ"]);

    let run = orch.run_pages(&first, "old.pdf", &first_pages, &config);
    let supersede = async {
        started.notified().await;
        let second = orch.select_file("new.pdf", &config);
        release.notify_one();
        second
    };
    let (result, second) = tokio::join!(run, supersede);

    match result {
        Err(TranslateError::Cancelled { session }) => assert_eq!(session, first.id),
        other => panic!("expected cancellation, got {other:?}"),
    }
    let session = orch.session();
    assert_eq!(session.id, second.id);
    assert!(session.error.is_none());
    assert!(recorder.errors.lock().unwrap().is_empty());
}

// ── Rendering ────────────────────────────────────────────────────────────────

#[test]
fn malformed_markers_stay_readable() {
    let units = render_document("price is $5 and text", &FormulaRenderer::default());
    assert_eq!(
        units,
        vec![RenderUnit::Text {
            text: "price is $5 and text".into()
        }]
    );
}

#[test]
fn display_math_precedes_inline() {
    let units = render_document("$$a$$", &FormulaRenderer::default());
    assert_eq!(units.len(), 1);
    assert!(matches!(units[0], RenderUnit::Formula { display: true, .. }));
}
