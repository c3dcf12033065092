//! Session state machines for the upload and query flows.
//!
//! A session's whole observable state is one [`SessionState`] value. Events
//! move it forward through `Idle -> Active -> Complete | Failed`; once terminal
//! the state never changes again, so duplicate terminal frames from a flaky
//! transport are harmless. A new user action gets a new [`SessionMachine`].

use std::fmt;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::metrics::STREAM_METRICS;
use crate::normalize::{NormalizedText, normalize};
use crate::streaming::{Status, StreamEvent};

/// Reason recorded when the stream ends before any terminal event
pub const STREAM_ENDED_UNEXPECTEDLY: &str = "stream ended unexpectedly";

/// Reason recorded when the stream ends without a single valid event
pub const NO_EVENTS_RECEIVED: &str = "stream ended before any event was received";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Upload,
    Query,
}

impl SessionKind {
    /// Message shown when the service reports an error without one
    pub fn fallback_error(&self) -> &'static str {
        match self {
            SessionKind::Upload => "Error uploading file. Please try again.",
            SessionKind::Query => "Error getting answer. Please try again.",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Upload => f.write_str("upload"),
            SessionKind::Query => f.write_str("query"),
        }
    }
}

/// Fields of an in-flight session
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub status: Status,
    pub message: String,
    /// Percentage in 0..=100; the latest reported value wins
    pub progress: u8,
}

impl Progress {
    fn initial() -> Self {
        Self {
            status: Status::Init,
            message: String::new(),
            progress: 0,
        }
    }
}

/// Result carried by a completed session
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The document was accepted; `message` is the service's confirmation
    Uploaded { message: String },
    /// The normalized answer to a question
    Answered(NormalizedText),
}

impl Outcome {
    pub fn answer(&self) -> Option<&NormalizedText> {
        match self {
            Outcome::Answered(text) => Some(text),
            Outcome::Uploaded { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active(Progress),
    Complete(Outcome),
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete(_) | SessionState::Failed(_))
    }

    /// Outcome of a finished session; a failure or an unfinished session
    /// becomes [`ClientError::StreamSemantic`].
    pub fn into_outcome(self) -> Result<Outcome> {
        match self {
            SessionState::Complete(outcome) => Ok(outcome),
            SessionState::Failed(reason) => Err(ClientError::StreamSemantic(reason)),
            SessionState::Idle | SessionState::Active(_) => Err(ClientError::StreamSemantic(
                "session has not finished".to_string(),
            )),
        }
    }

    /// Pure transition function for `kind` sessions.
    ///
    /// Terminal states absorb every event. An event arriving at an idle
    /// session starts it implicitly. Malformed events never change anything.
    pub fn transition(&self, kind: SessionKind, event: &StreamEvent) -> SessionState {
        if self.is_terminal() || event.is_malformed() {
            return self.clone();
        }

        match event {
            StreamEvent::Progress {
                status,
                message,
                progress,
            } => SessionState::Active(Progress {
                status: status.clone(),
                message: message.clone(),
                progress: *progress,
            }),
            StreamEvent::Complete { message, answer } => {
                let outcome = match kind {
                    SessionKind::Upload => Outcome::Uploaded {
                        message: message.clone(),
                    },
                    SessionKind::Query => {
                        Outcome::Answered(normalize(answer.as_deref().unwrap_or_default()))
                    }
                };
                SessionState::Complete(outcome)
            }
            StreamEvent::Error { message } => {
                let reason = if message.trim().is_empty() {
                    kind.fallback_error().to_string()
                } else {
                    message.clone()
                };
                SessionState::Failed(reason)
            }
            StreamEvent::Malformed { .. } => self.clone(),
        }
    }
}

/// Owner of one session's state.
///
/// `apply` takes `&mut self`; events must be applied in arrival order from a
/// single caller.
#[derive(Debug)]
pub struct SessionMachine {
    id: Uuid,
    kind: SessionKind,
    state: SessionState,
    valid_events: usize,
}

impl SessionMachine {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: SessionState::Idle,
            valid_events: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// `Idle -> Active(init, 0)`; a no-op in any other state
    pub fn start(&mut self) -> &SessionState {
        if self.state == SessionState::Idle {
            tracing::info!(session = %self.id, kind = %self.kind, "Session started");
            self.state = SessionState::Active(Progress::initial());
        }
        &self.state
    }

    pub fn apply(&mut self, event: &StreamEvent) -> &SessionState {
        if self.state.is_terminal() {
            tracing::debug!(
                session = %self.id,
                kind = event.kind(),
                "Ignoring event for finished session"
            );
            return &self.state;
        }

        if event.is_malformed() {
            return &self.state;
        }

        self.start();
        self.valid_events += 1;
        STREAM_METRICS.record_event();

        let next = self.state.transition(self.kind, event);
        self.set(next);
        &self.state
    }

    /// End of stream: a session that never reached a terminal state fails.
    pub fn finish(&mut self) -> &SessionState {
        if !self.state.is_terminal() {
            let reason = if self.valid_events == 0 {
                NO_EVENTS_RECEIVED
            } else {
                STREAM_ENDED_UNEXPECTEDLY
            };
            self.set(SessionState::Failed(reason.to_string()));
        }
        &self.state
    }

    /// Terminate the session after a transport failure.
    pub fn fail(&mut self, reason: impl Into<String>) -> &SessionState {
        if !self.state.is_terminal() {
            self.set(SessionState::Failed(reason.into()));
        }
        &self.state
    }

    fn set(&mut self, next: SessionState) {
        match &next {
            SessionState::Complete(_) => {
                STREAM_METRICS.record_completed();
                tracing::info!(session = %self.id, kind = %self.kind, "Session complete");
            }
            SessionState::Failed(reason) => {
                STREAM_METRICS.record_failed();
                tracing::warn!(session = %self.id, kind = %self.kind, %reason, "Session failed");
            }
            _ => {}
        }
        self.state = next;
    }
}
