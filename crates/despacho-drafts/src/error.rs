//! Draft store error types.

use despacho_core::{ActionKind, DraftId, Timestamp};
use despacho_storage::StorageError;

use crate::draft::DraftStatus;

/// Errors raised by the [`DraftStore`](crate::DraftStore).
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// No draft exists with this identifier.
    #[error("draft not found: {0}")]
    NotFound(DraftId),

    /// The requested transition is illegal from the draft's current status.
    #[error("cannot {operation} {draft_id}: draft is {status}")]
    InvalidState {
        /// The draft.
        draft_id: DraftId,
        /// Its current status.
        status: DraftStatus,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The draft was already finalized. Callers treat this as an idempotent
    /// no-op rather than a failure.
    #[error("{draft_id} was already sent")]
    AlreadyFinalized {
        /// The draft.
        draft_id: DraftId,
        /// When it was finalized.
        finalized_at: Option<Timestamp>,
    },

    /// A revision tried to change the draft's action kind.
    #[error("{draft_id} is a {expected} draft, revision payload is {found}")]
    KindMismatch {
        /// The draft.
        draft_id: DraftId,
        /// Kind recorded at creation.
        expected: ActionKind,
        /// Kind of the rejected payload.
        found: ActionKind,
    },

    /// A stored record references a revision that cannot be read.
    #[error("{draft_id} is missing revision {revision}")]
    MissingRevision {
        /// The draft.
        draft_id: DraftId,
        /// The unreadable revision.
        revision: u32,
    },

    /// The backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DraftError {
    /// Whether this error means the caller's bookkeeping is broken, as
    /// opposed to an expected outcome ([`AlreadyFinalized`](Self::AlreadyFinalized))
    /// or an infrastructure fault ([`Storage`](Self::Storage)).
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::InvalidState { .. }
                | Self::KindMismatch { .. }
                | Self::MissingRevision { .. }
        )
    }
}

/// Result type for draft store operations.
pub type DraftResult<T> = Result<T, DraftError>;
