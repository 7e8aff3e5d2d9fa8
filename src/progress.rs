//! Progress-callback trait for translation-session events.
//!
//! Inject an [`Arc<dyn SessionProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to follow a
//! session as it moves through its stages. The CLI drives its spinner from
//! these events; tests use them to check the exact stage order.
//!
//! # Example
//!
//! ```rust
//! use edgequake_scitranslate::{SessionProgressCallback, Stage, TranslationConfig};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl SessionProgressCallback for StageLog {
//!     fn on_stage(&self, _session: u64, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog(Mutex::new(Vec::new())));
//! let config = TranslationConfig::builder()
//!     .progress_callback(log.clone() as Arc<dyn SessionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::session::Stage;
use std::sync::Arc;

/// Called by the orchestrator as a session progresses.
///
/// Page events are raised from pdfium's blocking thread, so implementations
/// must be `Send + Sync`. All methods default to no-ops.
pub trait SessionProgressCallback: Send + Sync {
    /// Called when a session becomes current.
    fn on_session_start(&self, session: u64, file_name: &str) {
        let _ = (session, file_name);
    }

    /// Called on every stage transition, including the final one.
    fn on_stage(&self, session: u64, stage: Stage) {
        let _ = (session, stage);
    }

    /// Called after each page of text has been read.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages selected for extraction
    /// * `text_len`    — byte length of the page text
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when the session fails and returns to `Idle`.
    fn on_session_error(&self, session: u64, error: &str) {
        let _ = (session, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SessionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn SessionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        stages: Mutex<Vec<Stage>>,
        pages: AtomicUsize,
        errors: AtomicUsize,
    }

    impl SessionProgressCallback for TrackingCallback {
        fn on_stage(&self, _session: u64, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_page_extracted(&self, _page_num: usize, _total_pages: usize, _text_len: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_session_error(&self, _session: u64, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_session_start(1, "paper.pdf");
        cb.on_stage(1, Stage::Extracting);
        cb.on_page_extracted(1, 3, 42);
        cb.on_session_error(1, "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage(1, Stage::Extracting);
        tracker.on_page_extracted(1, 2, 10);
        tracker.on_page_extracted(2, 2, 12);
        tracker.on_stage(1, Stage::Translating);
        tracker.on_session_error(1, "translator down");

        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Extracting, Stage::Translating]
        );
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage(7, Stage::Complete);
    }
}
