//! Backend seams for the two built-in action kinds.

use async_trait::async_trait;
use despacho_core::{DuimpDraft, EmailDraft, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::ExecutionResult;

/// Proof that a backend accepted an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Backend-assigned reference (message id, declaration number).
    pub reference: String,
    /// Name of the backend that accepted the action.
    pub backend: String,
    /// When it was accepted.
    pub accepted_at: Timestamp,
}

impl Receipt {
    /// Create a receipt stamped now.
    #[must_use]
    pub fn new(backend: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            backend: backend.into(),
            accepted_at: Timestamp::now(),
        }
    }
}

/// Sends emails.
#[async_trait]
pub trait EmailBackend: Send + Sync {
    /// Backend name, for receipts and logs.
    fn name(&self) -> &str;

    /// Send one email.
    async fn send_email(&self, email: &EmailDraft) -> ExecutionResult<Receipt>;
}

/// Registers customs declarations.
#[async_trait]
pub trait DeclarationBackend: Send + Sync {
    /// Backend name, for receipts and logs.
    fn name(&self) -> &str;

    /// Register one DUIMP.
    async fn create_declaration(&self, duimp: &DuimpDraft) -> ExecutionResult<Receipt>;
}
