//! Recording delivery backends.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use despacho_core::{DuimpDraft, EmailDraft};
use despacho_executor::{DeclarationBackend, EmailBackend, ExecutionError, ExecutionResult, Receipt};

/// Shared failure script and call log.
#[derive(Debug, Default)]
struct Script {
    calls: AtomicUsize,
    fail_next: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl Script {
    async fn attempt(&self, name: &str) -> ExecutionResult<Receipt> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let delay = *self.delay.lock().expect("lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted || self.failing.load(Ordering::SeqCst) {
            return Err(ExecutionError::Transport(format!("{name} unavailable")));
        }
        Ok(Receipt::new(name, format!("{name}-{call}")))
    }
}

/// An [`EmailBackend`] that records every email it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingEmailBackend {
    script: Script,
    sent: Mutex<Vec<EmailDraft>>,
}

impl RecordingEmailBackend {
    /// Create a backend that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls with a transport error.
    #[must_use]
    pub fn failing_next(self, n: usize) -> Self {
        self.fail_next(n);
        self
    }

    /// Sleep before answering each call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.script.delay.lock().expect("lock poisoned") = Some(delay);
        self
    }

    /// Fail the next `n` calls with a transport error.
    pub fn fail_next(&self, n: usize) {
        self.script.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every call until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.script.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    /// Emails accepted so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailDraft> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl EmailBackend for RecordingEmailBackend {
    fn name(&self) -> &str {
        "recording-email"
    }

    async fn send_email(&self, email: &EmailDraft) -> ExecutionResult<Receipt> {
        let receipt = self.script.attempt(self.name()).await?;
        self.sent.lock().expect("lock poisoned").push(email.clone());
        Ok(receipt)
    }
}

/// A [`DeclarationBackend`] that records every declaration it is asked to
/// register.
#[derive(Debug, Default)]
pub struct RecordingDeclarationBackend {
    script: Script,
    created: Mutex<Vec<DuimpDraft>>,
}

impl RecordingDeclarationBackend {
    /// Create a backend that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls with a transport error.
    pub fn fail_next(&self, n: usize) {
        self.script.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every call until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.script.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    /// Declarations accepted so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn created(&self) -> Vec<DuimpDraft> {
        self.created.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl DeclarationBackend for RecordingDeclarationBackend {
    fn name(&self) -> &str {
        "recording-declaration"
    }

    async fn create_declaration(&self, duimp: &DuimpDraft) -> ExecutionResult<Receipt> {
        let receipt = self.script.attempt(self.name()).await?;
        self.created.lock().expect("lock poisoned").push(duimp.clone());
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let backend = RecordingEmailBackend::new().failing_next(1);
        let email = EmailDraft::new(["a@x.com"], "Hi");

        assert!(backend.send_email(&email).await.is_err());
        let receipt = backend.send_email(&email).await.unwrap();
        assert_eq!(receipt.reference, "recording-email-2");
        assert_eq!(backend.calls(), 2);
        assert_eq!(backend.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_set_failing() {
        let backend = RecordingDeclarationBackend::new();
        backend.set_failing(true);
        assert!(backend.create_declaration(&DuimpDraft::new("11222333000181")).await.is_err());
        backend.set_failing(false);
        assert!(backend.create_declaration(&DuimpDraft::new("11222333000181")).await.is_ok());
        assert_eq!(backend.created().len(), 1);
    }
}
