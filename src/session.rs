//! Translation sessions: the stage state machine and its single owner.
//!
//! A [`Session`] is a plain value. Every change goes through
//! [`Session::apply`], a pure function from `(session, event)` to the next
//! session, so transitions can be tested without any I/O.
//!
//! ```text
//! Idle ─▶ Extracting ─▶ Translating ─▶ Reconstructing ─▶ Complete
//!   ▲          │             │               │
//!   └──────────┴─────────────┴───────────────┘  Failed(message)
//! ```
//!
//! Stages are never skipped or repeated: a `StageEntered` event that does not
//! name the immediate successor is ignored. `Complete` additionally requires
//! a recorded translation.
//!
//! [`SessionCoordinator`] owns the one current session. Selecting a new file
//! bumps the session id and cancels the previous [`CancelToken`], so a run
//! that is still in flight can neither move the new session's stage nor
//! overwrite its result.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a session is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Extracting,
    Translating,
    Reconstructing,
    Complete,
}

impl Stage {
    /// Human-readable label shown in progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "Waiting for a document",
            Stage::Extracting => "Extracting Content",
            Stage::Translating => "Translating Text",
            Stage::Reconstructing => "Reconstructing Document",
            Stage::Complete => "Done",
        }
    }

    /// The only stage that may follow this one on the success path.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Extracting),
            Stage::Extracting => Some(Stage::Translating),
            Stage::Translating => Some(Stage::Reconstructing),
            Stage::Reconstructing => Some(Stage::Complete),
            Stage::Complete => None,
        }
    }

    /// True while a run is in progress.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Stage::Extracting | Stage::Translating | Stage::Reconstructing
        )
    }

    /// 1-based step number for the three working stages.
    pub fn step(&self) -> Option<usize> {
        match self {
            Stage::Extracting => Some(1),
            Stage::Translating => Some(2),
            Stage::Reconstructing => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Something that happened to the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new document was chosen; starts a fresh session.
    FileSelected { id: u64, file_name: String },
    /// The run moved on to the given stage.
    StageEntered(Stage),
    /// The translator returned text for this session.
    Translated(String),
    /// The run failed; the message is shown to the user.
    Failed(String),
}

/// Snapshot of one translation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: u64,
    pub file_name: Option<String>,
    pub stage: Stage,
    pub translated_text: Option<String>,
    pub error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: 0,
            file_name: None,
            stage: Stage::Idle,
            translated_text: None,
            error: None,
        }
    }
}

impl Session {
    /// Compute the session that results from `event`.
    ///
    /// Events that would skip or repeat a stage are ignored and the session
    /// is returned unchanged.
    pub fn apply(&self, event: SessionEvent) -> Session {
        match event {
            SessionEvent::FileSelected { id, file_name } => Session {
                id,
                file_name: Some(file_name),
                ..Session::default()
            },

            SessionEvent::StageEntered(next) => {
                if self.stage.successor() != Some(next) {
                    warn!(
                        "Session {}: ignoring stage {:?} while {:?}",
                        self.id, next, self.stage
                    );
                    return self.clone();
                }
                if next == Stage::Complete && !self.has_translation() {
                    warn!("Session {}: cannot complete without a translation", self.id);
                    return self.clone();
                }
                let mut s = self.clone();
                s.stage = next;
                if next == Stage::Extracting {
                    s.error = None;
                    s.translated_text = None;
                }
                s
            }

            SessionEvent::Translated(text) => {
                if self.stage != Stage::Translating {
                    warn!(
                        "Session {}: ignoring translation while {:?}",
                        self.id, self.stage
                    );
                    return self.clone();
                }
                let mut s = self.clone();
                s.translated_text = Some(text);
                s
            }

            SessionEvent::Failed(message) => Session {
                id: self.id,
                file_name: self.file_name.clone(),
                stage: Stage::Idle,
                translated_text: None,
                error: Some(message),
            },
        }
    }

    fn has_translation(&self) -> bool {
        self.translated_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Shared cancellation flag for one session run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Proof that a run belongs to a particular session.
///
/// Issued by [`SessionCoordinator::select_file`]; events dispatched with a
/// ticket from an older session are discarded.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub id: u64,
    pub token: CancelToken,
}

impl SessionTicket {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Single writer for the current session.
#[derive(Debug, Default)]
pub struct SessionCoordinator {
    session: Session,
    token: CancelToken,
    next_id: u64,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Start a new session for `file_name`, cancelling any run in flight.
    pub fn select_file(&mut self, file_name: impl Into<String>) -> SessionTicket {
        self.token.cancel();
        self.token = CancelToken::new();
        self.next_id += 1;

        let id = self.next_id;
        self.session = self.session.apply(SessionEvent::FileSelected {
            id,
            file_name: file_name.into(),
        });
        debug!("Session {} started", id);

        SessionTicket {
            id,
            token: self.token.clone(),
        }
    }

    /// Apply `event` if `ticket` still names the current session.
    ///
    /// Returns `false` when the event was discarded as stale.
    pub fn dispatch(&mut self, ticket: &SessionTicket, event: SessionEvent) -> bool {
        if ticket.id != self.session.id || ticket.is_cancelled() {
            warn!(
                "Discarding {:?} from stale session {} (current {})",
                event, ticket.id, self.session.id
            );
            return false;
        }
        self.session = self.session.apply(event);
        true
    }

    /// Whether `ticket` still names the current, uncancelled session.
    pub fn is_current(&self, ticket: &SessionTicket) -> bool {
        ticket.id == self.session.id && !ticket.is_cancelled()
    }
}
