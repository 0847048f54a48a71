//! Execution error types.

use std::time::Duration;

use despacho_core::{ActionKind, DraftId};
use despacho_drafts::DraftStatus;

/// Errors raised while executing a finalized draft.
///
/// None of these change the draft's status: a draft whose execution fails
/// stays `sent` and can only be retried explicitly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    /// The backend could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered and refused the action.
    #[error("rejected by backend (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The backend answered with something unreadable.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// The backend did not answer in time.
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    /// No backend is configured for this kind of action.
    #[error("no backend configured for {0} actions")]
    Unsupported(ActionKind),

    /// The draft has not been finalized, so it must not be executed.
    #[error("{draft_id} is {status}, only sent drafts can be executed")]
    NotFinalized {
        /// The draft.
        draft_id: DraftId,
        /// Its status.
        status: DraftStatus,
    },
}

impl From<reqwest::Error> for ExecutionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Result type for execution.
pub type ExecutionResult<T> = Result<T, ExecutionError>;
