//! AWAITING_CONFIRMATION handlers.

use despacho_core::{FieldCorrection, SessionId};
use despacho_drafts::{Draft, DraftError, RevisionReason};
use tracing::{debug, info, warn};

use super::{CONFIRM_PROMPT, Step, TurnController};
use crate::error::{RuntimeError, RuntimeResult};
use crate::outcome::{TurnOutcome, TurnStatus};
use crate::register::PendingAction;
use crate::session::SessionSlot;

impl TurnController {
    /// Read the latest revision and check the session owns the draft.
    async fn owned_latest(
        &self,
        session_id: &SessionId,
        pending: &PendingAction,
    ) -> RuntimeResult<Draft> {
        let draft = self.drafts.get_latest(pending.draft_id).await?;
        if draft.session_id != *session_id {
            return Err(RuntimeError::WrongSession {
                draft_id: draft.id,
                session_id: session_id.clone(),
            });
        }
        Ok(draft)
    }

    pub(super) async fn confirm(
        &self,
        session_id: &SessionId,
        pending: &PendingAction,
    ) -> RuntimeResult<Step> {
        let latest = self.owned_latest(session_id, pending).await?;
        debug!(draft_id = %latest.id, revision = latest.revision, "Confirming latest revision");

        match self.drafts.finalize(pending.draft_id).await {
            Ok(draft) => {
                self.register.clear(session_id);
                Ok(Step::Deliver(draft))
            },
            Err(DraftError::AlreadyFinalized { draft_id, .. }) => {
                self.register.clear(session_id);
                info!(draft_id = %draft_id, "Draft already finalized; not executing again");
                Ok(Step::Done(TurnOutcome::idle(
                    TurnStatus::AlreadySent,
                    Some(draft_id),
                    format!(
                        "Draft {} was already sent. Nothing was sent again.",
                        draft_id.short()
                    ),
                )))
            },
            Err(e) => Err(e.into()),
        }
    }

    pub(super) async fn cancel(
        &self,
        session_id: &SessionId,
        pending: &PendingAction,
    ) -> RuntimeResult<TurnOutcome> {
        self.owned_latest(session_id, pending).await?;
        let draft = self.drafts.cancel(pending.draft_id).await?;
        self.register.clear(session_id);

        if draft.is_sent() {
            return Ok(TurnOutcome::idle(
                TurnStatus::AlreadySent,
                Some(draft.id),
                format!("Draft {} was already sent and cannot be cancelled.", draft.id.short()),
            ));
        }

        Ok(TurnOutcome::idle(
            TurnStatus::Cancelled,
            Some(draft.id),
            format!("Cancelled draft {}. Nothing was sent.", draft.id.short()),
        ))
    }

    pub(super) async fn revise(
        &self,
        session_id: &SessionId,
        slot: &SessionSlot,
        pending: &PendingAction,
        instruction: &str,
    ) -> RuntimeResult<TurnOutcome> {
        let latest = self.owned_latest(session_id, pending).await?;
        let history = slot.messages().await;

        let payload = match self
            .decisions
            .regenerate(&history, &latest.payload, instruction)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(draft_id = %latest.id, error = %e, "Regeneration failed");
                return Ok(TurnOutcome::awaiting(
                    TurnStatus::DecisionFailed,
                    latest.id,
                    format!(
                        "I couldn't revise the draft ({e}). It is unchanged:\n\n{}\n\n{CONFIRM_PROMPT}",
                        latest.preview()
                    ),
                ));
            },
        };

        let reason = RevisionReason::Revised {
            instruction: instruction.to_owned(),
        };
        let draft = self.drafts.revise(latest.id, payload, reason).await?;
        Ok(self.represent(session_id, &draft))
    }

    pub(super) async fn correct(
        &self,
        session_id: &SessionId,
        pending: &PendingAction,
        correction: &FieldCorrection,
    ) -> RuntimeResult<TurnOutcome> {
        let latest = self.owned_latest(session_id, pending).await?;

        let payload = match latest.payload.apply_correction(correction) {
            Ok(payload) => payload,
            Err(e) => {
                info!(draft_id = %latest.id, error = %e, "Correction not applied");
                return Ok(TurnOutcome::awaiting(
                    TurnStatus::NeedsClarification,
                    latest.id,
                    format!(
                        "I couldn't apply that correction: {e}.\n\n{}\n\n{CONFIRM_PROMPT}",
                        pending.summary
                    ),
                ));
            },
        };

        let reason = RevisionReason::Corrected {
            field: correction.field,
        };
        let draft = self.drafts.revise(latest.id, payload, reason).await?;
        Ok(self.represent(session_id, &draft))
    }

    /// Refresh the register with the new revision and show it.
    fn represent(&self, session_id: &SessionId, draft: &Draft) -> TurnOutcome {
        let preview = draft.preview();
        self.register.set(PendingAction::new(
            session_id.clone(),
            draft.id,
            draft.kind,
            preview.clone(),
        ));
        TurnOutcome::awaiting(
            TurnStatus::Revised,
            draft.id,
            format!("Updated draft:\n\n{preview}\n\n{CONFIRM_PROMPT}"),
        )
    }
}
