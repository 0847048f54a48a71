//! Executing finalized drafts and explicit delivery retry.

use dashmap::DashSet;
use despacho_core::{DraftId, SessionId};
use despacho_drafts::Draft;
use despacho_telemetry::TurnContext;
use tracing::{Instrument, error, info, warn};

use super::TurnController;
use crate::error::{RuntimeError, RuntimeResult};
use crate::outcome::{TurnOutcome, TurnStatus};

/// Marks a draft as being delivered until dropped.
struct InFlight<'a> {
    set: &'a DashSet<DraftId>,
    draft_id: DraftId,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a DashSet<DraftId>, draft_id: DraftId) -> Option<Self> {
        set.insert(draft_id).then_some(Self { set, draft_id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.draft_id);
    }
}

impl TurnController {
    /// Run the executor for a draft that was just finalized.
    pub(super) async fn deliver(&self, draft: &Draft) -> TurnOutcome {
        let Some(_flight) = InFlight::claim(&self.in_flight, draft.id) else {
            warn!(draft_id = %draft.id, "Delivery already in progress");
            return TurnOutcome::idle(
                TurnStatus::AlreadySent,
                Some(draft.id),
                format!("Draft {} is already being sent.", draft.id.short()),
            );
        };
        self.execute_and_record(draft).await
    }

    /// Re-run the executor for a sent draft whose delivery failed.
    ///
    /// Never finalizes again. A draft that was already delivered yields
    /// [`TurnStatus::AlreadyDelivered`] without calling the backend.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::WrongSession`] if another session owns the draft
    /// - [`RuntimeError::NotRetryable`] if the draft is not `sent`
    /// - [`RuntimeError::DeliveryInProgress`] if a delivery is running
    /// - [`RuntimeError::Draft`] if the draft cannot be read
    pub async fn retry_delivery(
        &self,
        session_id: &SessionId,
        draft_id: DraftId,
    ) -> RuntimeResult<TurnOutcome> {
        let ctx = TurnContext::new("turn_controller")
            .with_session(session_id.as_str())
            .with_operation("retry_delivery");

        async {
            let draft = self.drafts.get_latest(draft_id).await?;
            if draft.session_id != *session_id {
                warn!(draft_id = %draft_id, owner = %draft.session_id, "Retry from foreign session rejected");
                return Err(RuntimeError::WrongSession {
                    draft_id,
                    session_id: session_id.clone(),
                });
            }
            if !draft.is_sent() {
                return Err(RuntimeError::NotRetryable {
                    draft_id,
                    status: draft.status,
                });
            }

            let _flight = InFlight::claim(&self.in_flight, draft_id)
                .ok_or(RuntimeError::DeliveryInProgress(draft_id))?;

            // Re-read under the claim: a delivery may have finished meanwhile.
            let draft = self.drafts.get_latest(draft_id).await?;
            if draft.delivery.is_delivered() {
                info!(draft_id = %draft_id, "Draft already delivered; retry skipped");
                return Ok(TurnOutcome::idle(
                    TurnStatus::AlreadyDelivered,
                    Some(draft_id),
                    format!("Draft {} was already delivered.", draft_id.short()),
                ));
            }

            info!(draft_id = %draft_id, attempts = draft.attempts, "Retrying delivery");
            Ok(self.execute_and_record(&draft).await)
        }
        .instrument(ctx.span())
        .await
    }

    async fn execute_and_record(&self, draft: &Draft) -> TurnOutcome {
        let short = draft.id.short();
        match self.executor.execute(draft).await {
            Ok(receipt) => {
                if let Err(e) = self
                    .drafts
                    .record_delivered(draft.id, receipt.reference.clone())
                    .await
                {
                    error!(draft_id = %draft.id, error = %e, "Failed to record delivery");
                }
                TurnOutcome::idle(
                    TurnStatus::Sent,
                    Some(draft.id),
                    format!(
                        "Done. {} {short} was accepted by {} (reference {}).",
                        draft.kind, receipt.backend, receipt.reference
                    ),
                )
            },
            Err(e) => {
                if let Err(record_err) = self.drafts.record_failed(draft.id, e.to_string()).await {
                    error!(draft_id = %draft.id, error = %record_err, "Failed to record delivery failure");
                }
                TurnOutcome::idle(
                    TurnStatus::DeliveryFailed,
                    Some(draft.id),
                    format!(
                        "Draft {short} was accepted for sending but delivery failed: {e}. \
                         It will not be resent automatically; retry it explicitly with /retry {short}."
                    ),
                )
            },
        }
    }
}
