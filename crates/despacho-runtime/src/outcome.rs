//! What one turn produced.

use std::fmt;

use despacho_core::DraftId;
use serde::{Deserialize, Serialize};

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The decision layer answered; nothing awaits confirmation.
    Replied,
    /// A new draft was created and awaits confirmation.
    Proposed,
    /// The pending draft got a new revision.
    Revised,
    /// A correction could not be applied; the draft is unchanged.
    NeedsClarification,
    /// The draft was finalized and delivered.
    Sent,
    /// The draft was finalized but delivery failed; retry is explicit.
    DeliveryFailed,
    /// The draft had already been finalized; nothing was executed.
    AlreadySent,
    /// Retry found the draft already delivered; nothing was executed.
    AlreadyDelivered,
    /// The pending draft was cancelled.
    Cancelled,
    /// The decision layer proposed an action no backend can carry out;
    /// nothing was drafted.
    Unsupported,
    /// The decision layer failed; state is unchanged.
    DecisionFailed,
    /// An internal invariant was violated; see the logs.
    InternalError,
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Replied => "replied",
            Self::Proposed => "proposed",
            Self::Revised => "revised",
            Self::NeedsClarification => "needs_clarification",
            Self::Sent => "sent",
            Self::DeliveryFailed => "delivery_failed",
            Self::AlreadySent => "already_sent",
            Self::AlreadyDelivered => "already_delivered",
            Self::Cancelled => "cancelled",
            Self::Unsupported => "unsupported",
            Self::DecisionFailed => "decision_failed",
            Self::InternalError => "internal_error",
        };
        f.write_str(s)
    }
}

/// Result of one turn, handed back to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Human-readable reply.
    pub response_text: String,
    /// Whether the session now awaits confirmation.
    pub awaiting_confirmation: bool,
    /// Draft the turn acted on, if any.
    pub draft_id: Option<DraftId>,
    /// How the turn ended.
    pub status: TurnStatus,
}

impl TurnOutcome {
    /// The session is idle after this turn.
    #[must_use]
    pub fn idle(status: TurnStatus, draft_id: Option<DraftId>, text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            awaiting_confirmation: false,
            draft_id,
            status,
        }
    }

    /// The session awaits confirmation of `draft_id` after this turn.
    #[must_use]
    pub fn awaiting(status: TurnStatus, draft_id: DraftId, text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            awaiting_confirmation: true,
            draft_id: Some(draft_id),
            status,
        }
    }

    /// A plain reply with no draft involved.
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::idle(TurnStatus::Replied, None, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_state() {
        let id = DraftId::new();
        let waiting = TurnOutcome::awaiting(TurnStatus::Proposed, id, "preview");
        assert!(waiting.awaiting_confirmation);
        assert_eq!(waiting.draft_id, Some(id));

        let reply = TurnOutcome::reply("hi");
        assert!(!reply.awaiting_confirmation);
        assert!(reply.draft_id.is_none());
        assert_eq!(reply.status, TurnStatus::Replied);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TurnStatus::DeliveryFailed).unwrap();
        assert_eq!(json, "\"delivery_failed\"");
        assert_eq!(TurnStatus::AlreadySent.to_string(), "already_sent");
    }
}
