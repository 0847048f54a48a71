//! The conversation turn controller.
//!
//! Each session is a two-state machine:
//!
//! ```text
//!            propose                    revise / correct
//!   IDLE ─────────────▶ AWAITING ◀──────────────────────┐
//!    ▲                  CONFIRMATION ────────────────────┘
//!    │                     │
//!    └─────────────────────┘
//!     confirm / cancel / unrelated
//! ```
//!
//! The pending-action register decides which state a session is in. It is
//! read once per turn, before anything else happens.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use despacho_confirm::{ConfirmationDetector, Intent};
use despacho_core::{DraftId, SessionId};
use despacho_drafts::{Draft, DraftStore};
use despacho_executor::ActionExecutor;
use despacho_llm::{Decision, DecisionLayer, Message};
use despacho_telemetry::TurnContext;
use tracing::{Instrument, error, info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::outcome::{TurnOutcome, TurnStatus};
use crate::register::{PendingAction, PendingActionRegister};
use crate::session::{DEFAULT_HISTORY_LIMIT, DEFAULT_IDLE_TIMEOUT, SessionSlot, SessionTable};

mod delivery;
mod pending;


/// Appended to every preview.
pub const CONFIRM_PROMPT: &str =
    "Reply \"yes\" to send, \"no\" to cancel, or tell me what to change.";

/// What the locked part of a turn decided.
enum Step {
    /// The turn is complete.
    Done(TurnOutcome),
    /// The draft was finalized; deliver it after releasing the session lock.
    Deliver(Draft),
}

/// Orchestrates turns across sessions.
///
/// Turns of one session run one at a time, in arrival order. Turns of
/// different sessions run in parallel.
pub struct TurnController {
    drafts: Arc<DraftStore>,
    detector: ConfirmationDetector,
    register: PendingActionRegister,
    decisions: Arc<dyn DecisionLayer>,
    executor: Arc<ActionExecutor>,
    sessions: SessionTable,
    idle_timeout: Duration,
    in_flight: DashSet<DraftId>,
}

impl TurnController {
    /// Create a controller with the built-in confirmation vocabulary.
    #[must_use]
    pub fn new(
        drafts: Arc<DraftStore>,
        decisions: Arc<dyn DecisionLayer>,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        Self {
            drafts,
            detector: ConfirmationDetector::builtin(),
            register: PendingActionRegister::new(),
            decisions,
            executor,
            sessions: SessionTable::new(DEFAULT_HISTORY_LIMIT),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            in_flight: DashSet::new(),
        }
    }

    /// Use a custom confirmation detector.
    #[must_use]
    pub fn with_detector(mut self, detector: ConfirmationDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Keep at most `limit` messages of history per session.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.sessions = SessionTable::new(limit);
        self
    }

    /// Drop the history of sessions idle for longer than `timeout`.
    ///
    /// Sessions with a pending action are kept regardless.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Evict idle sessions now. Returns how many were dropped.
    ///
    /// Also runs on its own at the start of a turn, at most once per idle
    /// timeout.
    pub fn evict_idle_sessions(&self) -> usize {
        let evicted = self
            .sessions
            .evict_idle(self.idle_timeout, |id| self.register.get(id).is_some());
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    /// The draft store.
    #[must_use]
    pub fn drafts(&self) -> &Arc<DraftStore> {
        &self.drafts
    }

    /// The pending-action register.
    #[must_use]
    pub fn register(&self) -> &PendingActionRegister {
        &self.register
    }

    /// The session's pending action, if any.
    #[must_use]
    pub fn pending(&self, session_id: &SessionId) -> Option<PendingAction> {
        self.register.get(session_id)
    }

    /// Messages kept for the session, oldest first.
    pub async fn history(&self, session_id: &SessionId) -> Vec<Message> {
        self.sessions.slot(session_id).messages().await
    }

    /// Per-session history bound.
    #[must_use]
    pub fn history_limit(&self) -> usize {
        self.sessions.history_limit()
    }

    /// Handle one user utterance.
    ///
    /// Never fails: errors become an outcome with
    /// [`TurnStatus::InternalError`] or [`TurnStatus::DecisionFailed`].
    pub async fn handle_turn(&self, session_id: &SessionId, utterance: &str) -> TurnOutcome {
        let ctx = TurnContext::new("turn_controller")
            .with_session(session_id.as_str())
            .with_operation("handle_turn");
        let span = ctx.span();

        async {
            let outcome = self.run_turn(session_id, utterance).await;
            let draft_id = outcome.draft_id.map(|id| id.to_string());
            info!(
                status = %outcome.status,
                awaiting_confirmation = outcome.awaiting_confirmation,
                draft_id = draft_id.as_deref(),
                elapsed_ms = ctx.elapsed_ms(),
                "Turn handled"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_turn(&self, session_id: &SessionId, utterance: &str) -> TurnOutcome {
        if self.sessions.sweep_due(self.idle_timeout) {
            self.evict_idle_sessions();
        }
        let slot = self.sessions.slot(session_id);
        let turn = slot.lock_turn().await;
        slot.record(Message::user(utterance)).await;

        let step = match self.step(session_id, &slot, utterance).await {
            Ok(step) => step,
            Err(e) => Step::Done(self.internal_error(session_id, &e)),
        };

        let draft = match step {
            Step::Done(outcome) => {
                slot.record(Message::assistant(outcome.response_text.clone()))
                    .await;
                return outcome;
            },
            Step::Deliver(draft) => draft,
        };

        // Finalize has committed. The external call runs without the lock;
        // the reply keeps its place ahead of any later turn.
        let reply = slot.reserve().await;
        drop(turn);
        let outcome = self.deliver(&draft).await;
        slot.fill(reply, Message::assistant(outcome.response_text.clone()))
            .await;
        outcome
    }

    async fn step(
        &self,
        session_id: &SessionId,
        slot: &SessionSlot,
        utterance: &str,
    ) -> RuntimeResult<Step> {
        let Some(pending) = self.register.get(session_id) else {
            return self.idle(session_id, slot).await.map(Step::Done);
        };

        let intent = self.detector.classify_for(utterance, pending.kind);
        info!(
            draft_id = %pending.draft_id,
            kind = %pending.kind,
            intent = %intent,
            "Reply to pending draft classified"
        );

        match intent {
            Intent::Confirm => self.confirm(session_id, &pending).await,
            Intent::Cancel => self.cancel(session_id, &pending).await.map(Step::Done),
            Intent::Revise { instruction } => self
                .revise(session_id, slot, &pending, &instruction)
                .await
                .map(Step::Done),
            Intent::Correct(correction) => self
                .correct(session_id, &pending, &correction)
                .await
                .map(Step::Done),
            Intent::Unrelated => {
                self.register.clear(session_id);
                info!(draft_id = %pending.draft_id, "Pending action abandoned");
                self.idle(session_id, slot).await.map(Step::Done)
            },
        }
    }

    /// IDLE: forward to the decision layer and open a draft if it proposes one.
    async fn idle(&self, session_id: &SessionId, slot: &SessionSlot) -> RuntimeResult<TurnOutcome> {
        let history = slot.messages().await;
        let decision = match self.decisions.decide(&history).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(layer = self.decisions.name(), error = %e, "Decision layer failed");
                return Ok(TurnOutcome::idle(
                    TurnStatus::DecisionFailed,
                    None,
                    format!("I couldn't process that right now ({e}). Please try again."),
                ));
            },
        };

        let proposal = match decision {
            Decision::Reply(text) => return Ok(TurnOutcome::reply(text)),
            Decision::Propose(proposal) => proposal,
        };

        let kind = proposal.payload.kind();
        if !self.executor.supports(kind) {
            warn!(kind = %kind, "Proposal for an action kind with no backend");
            return Ok(TurnOutcome::idle(
                TurnStatus::Unsupported,
                None,
                format!("I can't carry out {kind} actions here, so nothing was drafted."),
            ));
        }

        let draft = self.drafts.create(session_id, proposal.payload).await?;
        let preview = draft.preview();
        self.register.set(PendingAction::new(
            session_id.clone(),
            draft.id,
            draft.kind,
            preview.clone(),
        ));
        info!(draft_id = %draft.id, kind = %draft.kind, "Action proposed");

        let mut text = String::new();
        if let Some(note) = proposal.note.as_deref().map(str::trim)
            && !note.is_empty()
        {
            text.push_str(note);
            text.push_str("\n\n");
        }
        text.push_str(&preview);
        text.push_str("\n\n");
        text.push_str(CONFIRM_PROMPT);

        Ok(TurnOutcome::awaiting(TurnStatus::Proposed, draft.id, text))
    }

    /// Log a failed turn and build the user-facing response.
    ///
    /// Invariant violations also clear the pending reference so the session
    /// is not stuck replaying the same broken draft.
    fn internal_error(&self, session_id: &SessionId, err: &RuntimeError) -> TurnOutcome {
        if err.is_internal() {
            let cleared = self.register.clear(session_id);
            let draft_id = cleared.as_ref().map(|p| p.draft_id.to_string());
            error!(
                error = %err,
                draft_id = draft_id.as_deref(),
                "Internal invariant violated"
            );
            return TurnOutcome::idle(
                TurnStatus::InternalError,
                cleared.map(|p| p.draft_id),
                "Something went wrong on our side and the pending action was dropped. \
                 Nothing was sent.",
            );
        }

        error!(error = %err, "Turn failed");
        let draft_id = self.register.get(session_id).map(|p| p.draft_id);
        TurnOutcome {
            response_text: format!("I couldn't complete that ({err}). Please try again."),
            awaiting_confirmation: draft_id.is_some(),
            draft_id,
            status: TurnStatus::InternalError,
        }
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("decisions", &self.decisions.name())
            .field("pending_sessions", &self.register.len())
            .field("sessions", &self.sessions.len())
            .field("history_limit", &self.sessions.history_limit())
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}
