//! Dispatch of finalized drafts to their backend.

use std::sync::Arc;
use std::time::Duration;

use despacho_core::{ActionKind, ActionPayload};
use despacho_drafts::Draft;
use tracing::{info, warn};

use crate::backend::{DeclarationBackend, EmailBackend, Receipt};
use crate::error::{ExecutionError, ExecutionResult};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the side effect of a finalized draft.
///
/// The executor never touches draft state. Callers finalize first, execute
/// second, and record the outcome themselves.
#[derive(Clone)]
pub struct ActionExecutor {
    email: Option<Arc<dyn EmailBackend>>,
    declarations: Option<Arc<dyn DeclarationBackend>>,
    timeout: Duration,
}

impl ActionExecutor {
    /// Create an executor with no backends.
    #[must_use]
    pub fn new() -> Self {
        Self {
            email: None,
            declarations: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the email backend.
    #[must_use]
    pub fn with_email_backend(mut self, backend: Arc<dyn EmailBackend>) -> Self {
        self.email = Some(backend);
        self
    }

    /// Set the declaration backend.
    #[must_use]
    pub fn with_declaration_backend(mut self, backend: Arc<dyn DeclarationBackend>) -> Self {
        self.declarations = Some(backend);
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a backend is configured for `kind`.
    #[must_use]
    pub fn supports(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Email => self.email.is_some(),
            ActionKind::Duimp => self.declarations.is_some(),
            ActionKind::Other => false,
        }
    }

    /// Execute a finalized draft.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::NotFinalized`] unless the draft is `sent`
    /// - [`ExecutionError::Unsupported`] if no backend handles its kind
    /// - [`ExecutionError::Timeout`] if the backend exceeds the timeout
    /// - any error the backend reports
    pub async fn execute(&self, draft: &Draft) -> ExecutionResult<Receipt> {
        if !draft.is_sent() {
            return Err(ExecutionError::NotFinalized {
                draft_id: draft.id,
                status: draft.status,
            });
        }

        let result = match tokio::time::timeout(self.timeout, self.dispatch(&draft.payload)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::Timeout(self.timeout)),
        };

        match &result {
            Ok(receipt) => info!(
                draft_id = %draft.id,
                revision = draft.revision,
                backend = %receipt.backend,
                reference = %receipt.reference,
                "Action executed"
            ),
            Err(e) => warn!(
                draft_id = %draft.id,
                revision = draft.revision,
                error = %e,
                "Action execution failed"
            ),
        }
        result
    }

    async fn dispatch(&self, payload: &ActionPayload) -> ExecutionResult<Receipt> {
        match payload {
            ActionPayload::Email(email) => {
                let backend = self
                    .email
                    .as_ref()
                    .ok_or(ExecutionError::Unsupported(ActionKind::Email))?;
                backend.send_email(email).await
            },
            ActionPayload::Duimp(duimp) => {
                let backend = self
                    .declarations
                    .as_ref()
                    .ok_or(ExecutionError::Unsupported(ActionKind::Duimp))?;
                backend.create_declaration(duimp).await
            },
            ActionPayload::Other(_) => Err(ExecutionError::Unsupported(ActionKind::Other)),
        }
    }
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("email", &self.email.as_ref().map(|b| b.name().to_string()))
            .field(
                "declarations",
                &self.declarations.as_ref().map(|b| b.name().to_string()),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::OutboxBackend;
    use async_trait::async_trait;
    use despacho_core::{DuimpDraft, EmailDraft, GenericDraft, SessionId};
    use despacho_drafts::DraftStore;

    struct SlowEmail;

    #[async_trait]
    impl EmailBackend for SlowEmail {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send_email(&self, _email: &EmailDraft) -> ExecutionResult<Receipt> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Receipt::new("slow", "late"))
        }
    }

    async fn sent(payload: ActionPayload) -> Draft {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&SessionId::new("s"), payload).await.unwrap();
        store.finalize(draft.id).await.unwrap()
    }

    fn email() -> ActionPayload {
        ActionPayload::Email(EmailDraft::new(["x@y.com"], "Meeting"))
    }

    #[tokio::test]
    async fn test_pending_draft_is_rejected() {
        let store = DraftStore::in_memory().unwrap();
        let draft = store.create(&SessionId::new("s"), email()).await.unwrap();
        let outbox = Arc::new(OutboxBackend::new());
        let executor = ActionExecutor::new().with_email_backend(outbox.clone());

        let err = executor.execute(&draft).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NotFinalized { .. }));
        assert!(outbox.is_empty());
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let outbox = Arc::new(OutboxBackend::new());
        let executor = ActionExecutor::new()
            .with_email_backend(outbox.clone())
            .with_declaration_backend(outbox.clone());

        let receipt = executor.execute(&sent(email()).await).await.unwrap();
        assert_eq!(receipt.backend, "outbox");

        let duimp = ActionPayload::Duimp(DuimpDraft::new("12345678000195").with_ncm("84713012"));
        executor.execute(&sent(duimp).await).await.unwrap();
        assert_eq!(outbox.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_backend_is_unsupported() {
        let executor = ActionExecutor::new();
        assert!(!executor.supports(ActionKind::Email));
        let err = executor.execute(&sent(email()).await).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Unsupported(ActionKind::Email)));

        let other = ActionPayload::Other(GenericDraft {
            name: "ptax".into(),
            fields: serde_json::Map::new(),
        });
        let err = executor.execute(&sent(other).await).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Unsupported(ActionKind::Other)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let executor = ActionExecutor::new()
            .with_email_backend(Arc::new(SlowEmail))
            .with_timeout(Duration::from_millis(20));
        let err = executor.execute(&sent(email()).await).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Timeout(_)));
    }
}
