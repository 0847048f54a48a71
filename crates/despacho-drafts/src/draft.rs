//! Draft, revision, and delivery types.

use std::fmt;

use despacho_core::{ActionKind, ActionPayload, DraftId, PayloadField, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a draft.
///
/// `Pending` moves to `Sent` at most once. `Cancelled` never moves to `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Awaiting confirmation; may still be revised.
    Pending,
    /// Finalized and accepted for execution.
    Sent,
    /// Cancelled by the user.
    Cancelled,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Why a revision was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RevisionReason {
    /// First revision, proposed by the decision layer.
    Initial,
    /// Regenerated on request ("improve it").
    Revised {
        /// The user's instruction.
        instruction: String,
    },
    /// One field replaced by a targeted correction.
    Corrected {
        /// The replaced field.
        field: PayloadField,
    },
}

impl fmt::Display for RevisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial proposal"),
            Self::Revised { instruction } => write!(f, "revised: {instruction}"),
            Self::Corrected { field } => write!(f, "corrected {field}"),
        }
    }
}

/// One immutable payload snapshot of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRevision {
    /// Revision number, starting at 1.
    pub revision: u32,
    /// Payload at this revision.
    pub payload: ActionPayload,
    /// What produced this revision.
    pub reason: RevisionReason,
    /// When this revision was written.
    pub created_at: Timestamp,
}

/// Outcome of the most recent execution attempt for a sent draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryState {
    /// The executor has not run yet.
    NotAttempted,
    /// The backend accepted the action.
    Delivered {
        /// Backend receipt (message id, declaration number).
        receipt: String,
        /// When delivery succeeded.
        at: Timestamp,
    },
    /// The last attempt failed; the draft stays `sent`.
    Failed {
        /// Error reported by the executor.
        error: String,
        /// When the attempt failed.
        at: Timestamp,
    },
}

impl DeliveryState {
    /// Whether the action reached its backend.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Persisted per-draft record; the payload lives in the revisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DraftRecord {
    pub(crate) id: DraftId,
    pub(crate) session_id: SessionId,
    pub(crate) kind: ActionKind,
    pub(crate) status: DraftStatus,
    pub(crate) latest_revision: u32,
    pub(crate) created_at: Timestamp,
    pub(crate) updated_at: Timestamp,
    #[serde(default)]
    pub(crate) finalized_at: Option<Timestamp>,
    #[serde(default)]
    pub(crate) cancelled_at: Option<Timestamp>,
    pub(crate) delivery: DeliveryState,
    #[serde(default)]
    pub(crate) attempts: u32,
}

impl DraftRecord {
    pub(crate) fn into_draft(self, revision: DraftRevision) -> Draft {
        Draft {
            id: self.id,
            session_id: self.session_id,
            kind: self.kind,
            revision: revision.revision,
            payload: revision.payload,
            reason: revision.reason,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            finalized_at: self.finalized_at,
            cancelled_at: self.cancelled_at,
            delivery: self.delivery,
            attempts: self.attempts,
        }
    }
}

/// A draft as read from the store, carrying its latest revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Stable identifier across revisions.
    pub id: DraftId,
    /// Owning session.
    pub session_id: SessionId,
    /// Action kind, fixed at creation.
    pub kind: ActionKind,
    /// Latest revision number.
    pub revision: u32,
    /// Payload of the latest revision.
    pub payload: ActionPayload,
    /// What produced the latest revision.
    pub reason: RevisionReason,
    /// Lifecycle status.
    pub status: DraftStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification (revision, status, or delivery).
    pub updated_at: Timestamp,
    /// Finalization time, once sent.
    pub finalized_at: Option<Timestamp>,
    /// Cancellation time, once cancelled.
    pub cancelled_at: Option<Timestamp>,
    /// Last execution outcome.
    pub delivery: DeliveryState,
    /// Number of execution attempts recorded.
    pub attempts: u32,
}

impl Draft {
    /// Whether the draft can still be revised or finalized.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == DraftStatus::Pending
    }

    /// Whether the draft has been finalized.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.status == DraftStatus::Sent
    }

    /// Human-readable preview of the latest payload, headed by id and revision.
    #[must_use]
    pub fn preview(&self) -> String {
        format!(
            "[{} rev {}]\n{}",
            self.id.short(),
            self.revision,
            self.payload.preview()
        )
    }

    /// One-line description for listings.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let delivery = match &self.delivery {
            DeliveryState::NotAttempted => String::new(),
            DeliveryState::Delivered { receipt, .. } => format!(" delivered ({receipt})"),
            DeliveryState::Failed { error, .. } => format!(" delivery failed ({error})"),
        };
        format!(
            "{} {} rev {} {}{} updated {}",
            self.id.short(),
            self.kind,
            self.revision,
            self.status,
            delivery,
            self.updated_at
        )
    }
}
