//! Per-turn correlation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation data for one conversational turn.
///
/// A front end creates one per incoming utterance; the controller enters
/// its [`span`](Self::span) so every log line emitted while handling the
/// turn carries the same request and session fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Correlation ID shared by related requests (a turn and its retry).
    pub correlation_id: Uuid,
    /// Session the turn belongs to.
    pub session_id: Option<String>,
    /// When the turn started.
    pub started_at: DateTime<Utc>,
    /// Component that created this context.
    pub source: String,
    /// Operation being performed.
    pub operation: Option<String>,
}

impl TurnContext {
    /// Create a new context.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            session_id: None,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
        }
    }

    /// Create a child context that keeps the correlation and session.
    #[must_use]
    pub fn child(&self, operation: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            session_id: self.session_id.clone(),
            started_at: Utc::now(),
            source: self.source.clone(),
            operation: Some(operation.into()),
        }
    }

    /// Set the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set the session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Milliseconds since the turn started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Create a tracing span carrying this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "turn",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            session_id = self.session_id.as_deref(),
            source = %self.source,
            operation = self.operation.as_deref(),
        )
    }

    /// First 8 characters of the request ID.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string()[..8].to_string()
    }
}

impl Default for TurnContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Guard that enters the turn span and logs when the turn completes.
///
/// Only for synchronous scopes; async code should use
/// `tracing::Instrument` with [`TurnContext::span`].
pub struct TurnGuard {
    context: TurnContext,
    _span: tracing::span::EnteredSpan,
}

impl TurnGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: TurnContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("turn started");
        Self {
            context,
            _span: span,
        }
    }

    /// Get the turn context.
    #[must_use]
    pub fn context(&self) -> &TurnContext {
        &self.context
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "turn completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = TurnContext::new("cli");
        assert_eq!(ctx.source, "cli");
        assert_eq!(ctx.request_id, ctx.correlation_id);
        assert!(ctx.session_id.is_none());
        assert!(ctx.operation.is_none());
    }

    #[test]
    fn test_context_builder() {
        let correlation = Uuid::new_v4();
        let ctx = TurnContext::new("cli")
            .with_correlation_id(correlation)
            .with_session("chat-42")
            .with_operation("handle_turn");

        assert_eq!(ctx.correlation_id, correlation);
        assert_eq!(ctx.session_id.as_deref(), Some("chat-42"));
        assert_eq!(ctx.operation.as_deref(), Some("handle_turn"));
    }

    #[test]
    fn test_child_keeps_correlation() {
        let parent = TurnContext::new("cli").with_session("s1");
        let child = parent.child("retry_delivery");

        assert_ne!(child.request_id, parent.request_id);
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.session_id.as_deref(), Some("s1"));
        assert_eq!(child.operation.as_deref(), Some("retry_delivery"));
    }

    #[test]
    fn test_elapsed_and_short_id() {
        let ctx = TurnContext::new("test");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(ctx.elapsed_ms() >= 5);
        assert_eq!(ctx.short_id().len(), 8);
    }

    #[test]
    fn test_guard_exposes_context() {
        let guard = TurnGuard::new(TurnContext::new("test").with_operation("op"));
        assert_eq!(guard.context().operation.as_deref(), Some("op"));
    }

    #[test]
    fn test_serialization() {
        let ctx = TurnContext::new("cli").with_session("s1");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"session_id\":\"s1\""));

        let parsed: TurnContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, ctx.request_id);
    }
}
