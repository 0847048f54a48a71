//! Dry-run backend: logs and keeps every action instead of performing it.

use std::sync::Mutex;

use async_trait::async_trait;
use despacho_core::{ActionPayload, DuimpDraft, EmailDraft};
use tracing::info;

use crate::backend::{DeclarationBackend, EmailBackend, Receipt};
use crate::error::{ExecutionError, ExecutionResult};

/// Backend used when `executor.dry_run` is set.
///
/// Implements both backend traits; actions are appended to an in-memory
/// outbox and logged at `info`.
#[derive(Debug, Default)]
pub struct OutboxBackend {
    outbox: Mutex<Vec<ActionPayload>>,
}

impl OutboxBackend {
    /// Create an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions accepted so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ActionPayload> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Number of accepted actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outbox.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Whether nothing was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, payload: ActionPayload) -> ExecutionResult<Receipt> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;
        outbox.push(payload);
        Ok(Receipt::new("outbox", format!("dry-run-{}", outbox.len())))
    }
}

#[async_trait]
impl EmailBackend for OutboxBackend {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send_email(&self, email: &EmailDraft) -> ExecutionResult<Receipt> {
        info!(to = %email.to.join(", "), subject = %email.subject, "Dry run: email not sent");
        self.push(ActionPayload::Email(email.clone()))
    }
}

#[async_trait]
impl DeclarationBackend for OutboxBackend {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn create_declaration(&self, duimp: &DuimpDraft) -> ExecutionResult<Receipt> {
        info!(importer = %duimp.importer_cnpj, "Dry run: declaration not registered");
        self.push(ActionPayload::Duimp(duimp.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_numbers_receipts() {
        let outbox = OutboxBackend::new();
        let first = outbox
            .send_email(&EmailDraft::new(["a@b.com"], "One"))
            .await
            .unwrap();
        let second = outbox
            .create_declaration(&DuimpDraft::new("12345678000195"))
            .await
            .unwrap();
        assert_eq!(first.reference, "dry-run-1");
        assert_eq!(second.reference, "dry-run-2");
        assert_eq!(outbox.entries().len(), 2);
    }
}
