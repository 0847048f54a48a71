//! Per-session register of the action awaiting confirmation.

use dashmap::DashMap;
use despacho_core::{ActionKind, DraftId, SessionId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The draft a session's next reply will be interpreted against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Owning session.
    pub session_id: SessionId,
    /// Draft awaiting confirmation.
    pub draft_id: DraftId,
    /// Kind of the draft.
    pub kind: ActionKind,
    /// Preview shown to the user, repeated on re-display.
    pub summary: String,
    /// When this reference was set.
    pub set_at: Timestamp,
}

impl PendingAction {
    /// Create a reference stamped now.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        draft_id: DraftId,
        kind: ActionKind,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            draft_id,
            kind,
            summary: summary.into(),
            set_at: Timestamp::now(),
        }
    }
}

/// Process-wide map of session to pending action.
///
/// At most one entry per session. Setting a new entry supersedes the old
/// one; the superseded draft stays in the store untouched.
#[derive(Debug, Default)]
pub struct PendingActionRegister {
    entries: DashMap<SessionId, PendingAction>,
}

impl PendingActionRegister {
    /// Create an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `action` for its session, returning the entry it replaced.
    pub fn set(&self, action: PendingAction) -> Option<PendingAction> {
        let previous = self.entries.insert(action.session_id.clone(), action);
        if let Some(prev) = &previous {
            debug!(
                session_id = %prev.session_id,
                draft_id = %prev.draft_id,
                "Pending action superseded"
            );
        }
        previous
    }

    /// The session's pending action, if any.
    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<PendingAction> {
        self.entries.get(session_id).map(|entry| entry.value().clone())
    }

    /// Remove the session's pending action, returning it.
    pub fn clear(&self, session_id: &SessionId) -> Option<PendingAction> {
        self.entries.remove(session_id).map(|(_, action)| action)
    }

    /// Number of sessions awaiting confirmation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no session is awaiting confirmation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
