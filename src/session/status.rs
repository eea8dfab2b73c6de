use crate::error::DictationError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of one dictation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session running; ready for `start`.
    Idle,
    /// Transport handshake in progress.
    Connecting,
    /// Capture running, chunks flowing out, fragments flowing in.
    Capturing,
    /// Teardown in progress (graceful or after a failure).
    Stopping,
}

/// Machine-readable status code accompanying every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ready,
    Connecting,
    Listening,
    Finalizing,
    Stopped,
    ConnectFailed,
    ConnectionLost,
    DeviceUnavailable,
    PermissionDenied,
    Unsupported,
}

impl StatusCode {
    pub fn from_error(err: &DictationError) -> Self {
        match err {
            DictationError::DeviceUnavailable(_) => Self::DeviceUnavailable,
            DictationError::PermissionDenied(_) => Self::PermissionDenied,
            DictationError::ConnectFailed(_) => Self::ConnectFailed,
            DictationError::ConnectionLost(_) => Self::ConnectionLost,
            DictationError::UnsupportedEnvironment(_) => Self::Unsupported,
            // Batch failures never flow through the live session; mapped for
            // completeness.
            DictationError::UploadFailed(_) | DictationError::ServerError(_) => {
                Self::ConnectFailed
            }
        }
    }
}

/// Status projection published on every state transition.
///
/// UI collaborators derive everything from this snapshot instead of mutating
/// their own flags.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub code: StatusCode,
    /// Human-readable message for display.
    pub message: String,
}

impl SessionStatus {
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            code: StatusCode::Ready,
            message: "Ready".to_string(),
        }
    }

    /// Whether the record trigger should be clickable right now: a new
    /// session can start from `Idle`, a running one can be stopped from
    /// `Capturing`. During `Connecting` and `Stopping` the trigger is off.
    pub fn record_trigger_enabled(&self) -> bool {
        matches!(self.state, SessionState::Idle | SessionState::Capturing)
    }
}

/// Snapshot of session statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub state: SessionState,

    /// When the current (or last) session started.
    pub started_at: Option<DateTime<Utc>>,

    /// Number of fragments appended to the transcript so far.
    pub fragment_count: usize,
}
