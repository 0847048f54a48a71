//! Runtime error types.

use despacho_core::{DraftId, SessionId};
use despacho_drafts::{DraftError, DraftStatus};
use thiserror::Error;

/// Errors that can occur in the runtime.
///
/// [`TurnController::handle_turn`](crate::TurnController::handle_turn) never
/// returns these; it logs them and answers with an internal-error outcome.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Draft store failure, including invariant violations.
    #[error("draft store error: {0}")]
    Draft(#[from] DraftError),

    /// Decision layer failure.
    #[error("decision layer error: {0}")]
    Decision(#[from] despacho_llm::LlmError),

    /// Storage backend failure outside the draft store.
    #[error("storage error: {0}")]
    Storage(#[from] despacho_storage::StorageError),

    /// The pending-action register points at a draft of another session.
    #[error("{draft_id} does not belong to {session_id}")]
    WrongSession {
        /// The draft.
        draft_id: DraftId,
        /// The session that asked for it.
        session_id: SessionId,
    },

    /// Retry asked for a draft that was never finalized.
    #[error("{draft_id} is {status}; only sent drafts can be retried")]
    NotRetryable {
        /// The draft.
        draft_id: DraftId,
        /// Its status.
        status: DraftStatus,
    },

    /// Another delivery of the same draft is in progress.
    #[error("delivery of {0} is already in progress")]
    DeliveryInProgress(DraftId),

    /// Configuration could not be turned into runtime components.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RuntimeError {
    /// Whether the error means the runtime's own bookkeeping is broken.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Draft(e) => e.is_invariant_violation(),
            Self::WrongSession { .. } => true,
            _ => false,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
