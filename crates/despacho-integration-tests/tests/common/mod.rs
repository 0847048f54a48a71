//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use despacho_core::{DraftId, SessionId};
use despacho_drafts::{Draft, DraftStore};
use despacho_executor::ActionExecutor;
use despacho_runtime::{TurnController, TurnOutcome};
use despacho_storage::KvStore;
use despacho_test::{
    MockDecisionLayer, RecordingDeclarationBackend, RecordingEmailBackend, setup_test_logging,
};

/// A controller wired to a scripted decision layer and recording backends.
pub struct TurnHarness {
    /// The controller under test.
    pub controller: Arc<TurnController>,
    /// Scripted decisions.
    pub decisions: Arc<MockDecisionLayer>,
    /// Email backend.
    pub email: Arc<RecordingEmailBackend>,
    /// Declaration backend.
    pub declarations: Arc<RecordingDeclarationBackend>,
}

impl TurnHarness {
    /// Build a harness over an in-memory draft store.
    pub fn new(decisions: MockDecisionLayer) -> Self {
        Self::builder(decisions).build()
    }

    /// Start building a harness with customisation options.
    pub fn builder(decisions: MockDecisionLayer) -> HarnessBuilder {
        HarnessBuilder {
            decisions,
            email: RecordingEmailBackend::new(),
            store: None,
            timeout: None,
        }
    }

    /// Run one turn.
    pub async fn turn(&self, session: &SessionId, utterance: &str) -> TurnOutcome {
        self.controller.handle_turn(session, utterance).await
    }

    /// Latest state of a draft.
    pub async fn draft(&self, id: DraftId) -> Draft {
        self.controller
            .drafts()
            .get_latest(id)
            .await
            .expect("draft should exist")
    }
}

/// Builder for [`TurnHarness`].
pub struct HarnessBuilder {
    decisions: MockDecisionLayer,
    email: RecordingEmailBackend,
    store: Option<Arc<dyn KvStore>>,
    timeout: Option<Duration>,
}

impl HarnessBuilder {
    /// Use a custom email backend.
    pub fn email(mut self, email: RecordingEmailBackend) -> Self {
        self.email = email;
        self
    }

    /// Keep drafts in the given store.
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Bound executor calls.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the harness.
    pub fn build(self) -> TurnHarness {
        setup_test_logging();

        let decisions = Arc::new(self.decisions);
        let email = Arc::new(self.email);
        let declarations = Arc::new(RecordingDeclarationBackend::new());

        let mut executor = ActionExecutor::new()
            .with_email_backend(email.clone())
            .with_declaration_backend(declarations.clone());
        if let Some(timeout) = self.timeout {
            executor = executor.with_timeout(timeout);
        }

        let drafts = match self.store {
            Some(store) => DraftStore::new(store),
            None => DraftStore::in_memory(),
        }
        .expect("draft store should open");

        let controller = TurnController::new(Arc::new(drafts), decisions.clone(), Arc::new(executor));

        TurnHarness {
            controller: Arc::new(controller),
            decisions,
            email,
            declarations,
        }
    }
}
