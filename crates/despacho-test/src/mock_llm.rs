//! Scripted decision layer.
//!
//! [`MockDecisionLayer`] replays queued decisions and regenerations in
//! order and records what it was asked, so tests can drive the turn
//! controller without a model.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use despacho_core::ActionPayload;
use despacho_llm::{Decision, DecisionLayer, LlmError, LlmResult, Message, Proposal};

/// Reply used when the decision queue is empty.
pub const DEFAULT_MOCK_REPLY: &str = "(mock reply)";

/// One scripted answer to [`DecisionLayer::decide`].
#[derive(Debug, Clone)]
pub enum MockDecision {
    /// Answer in text.
    Reply(String),
    /// Propose an action.
    Propose(Proposal),
    /// Fail with [`LlmError::ApiRequestFailed`].
    Error(String),
}

impl MockDecision {
    /// A text reply.
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }

    /// A proposal without a note.
    #[must_use]
    pub fn propose(payload: ActionPayload) -> Self {
        Self::Propose(Proposal::new(payload))
    }

    /// A proposal with a note shown above the preview.
    #[must_use]
    pub fn propose_with_note(payload: ActionPayload, note: impl Into<String>) -> Self {
        Self::Propose(Proposal {
            payload,
            note: Some(note.into()),
        })
    }

    /// A failure.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// One scripted answer to [`DecisionLayer::regenerate`].
#[derive(Debug, Clone)]
pub enum MockRegeneration {
    /// Return this payload.
    Payload(ActionPayload),
    /// Fail with [`LlmError::ApiRequestFailed`].
    Error(String),
}

/// A deterministic, queue-based [`DecisionLayer`] for tests.
///
/// When the decision queue runs dry it replies with [`DEFAULT_MOCK_REPLY`];
/// when the regeneration queue runs dry it returns the prior payload.
#[derive(Debug, Default)]
pub struct MockDecisionLayer {
    decisions: Mutex<VecDeque<MockDecision>>,
    regenerations: Mutex<VecDeque<MockRegeneration>>,
    decide_histories: Mutex<Vec<Vec<Message>>>,
    instructions: Mutex<Vec<String>>,
}

impl MockDecisionLayer {
    /// Create a mock with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a decision.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_decision(self, decision: MockDecision) -> Self {
        self.push_decision(decision);
        self
    }

    /// Queue a regeneration result.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_regeneration(self, payload: ActionPayload) -> Self {
        self.push_regeneration(MockRegeneration::Payload(payload));
        self
    }

    /// Queue a failing regeneration.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_failed_regeneration(self, message: impl Into<String>) -> Self {
        self.push_regeneration(MockRegeneration::Error(message.into()));
        self
    }

    /// Queue a decision on a shared mock.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_decision(&self, decision: MockDecision) {
        self.decisions
            .lock()
            .expect("lock poisoned")
            .push_back(decision);
    }

    /// Queue a regeneration result on a shared mock.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_regeneration(&self, regeneration: MockRegeneration) {
        self.regenerations
            .lock()
            .expect("lock poisoned")
            .push_back(regeneration);
    }

    /// Number of `decide` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn decide_calls(&self) -> usize {
        self.decide_histories.lock().expect("lock poisoned").len()
    }

    /// Number of `regenerate` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn regenerate_calls(&self) -> usize {
        self.instructions.lock().expect("lock poisoned").len()
    }

    /// Histories passed to `decide`, one per call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn captured_histories(&self) -> Vec<Vec<Message>> {
        self.decide_histories.lock().expect("lock poisoned").clone()
    }

    /// Instructions passed to `regenerate`, one per call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn captured_instructions(&self) -> Vec<String> {
        self.instructions.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl DecisionLayer for MockDecisionLayer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn decide(&self, history: &[Message]) -> LlmResult<Decision> {
        self.decide_histories
            .lock()
            .expect("lock poisoned")
            .push(history.to_vec());
        let next = self.decisions.lock().expect("lock poisoned").pop_front();

        match next {
            None => Ok(Decision::Reply(DEFAULT_MOCK_REPLY.to_string())),
            Some(MockDecision::Reply(text)) => Ok(Decision::Reply(text)),
            Some(MockDecision::Propose(proposal)) => Ok(Decision::Propose(proposal)),
            Some(MockDecision::Error(message)) => Err(LlmError::ApiRequestFailed(message)),
        }
    }

    async fn regenerate(
        &self,
        _history: &[Message],
        prior: &ActionPayload,
        instruction: &str,
    ) -> LlmResult<ActionPayload> {
        self.instructions
            .lock()
            .expect("lock poisoned")
            .push(instruction.to_string());
        let next = self.regenerations.lock().expect("lock poisoned").pop_front();

        match next {
            None => Ok(prior.clone()),
            Some(MockRegeneration::Payload(payload)) => Ok(payload),
            Some(MockRegeneration::Error(message)) => Err(LlmError::ApiRequestFailed(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{test_email, test_email_formal};

    #[tokio::test]
    async fn test_replays_in_order_then_defaults() {
        let mock = MockDecisionLayer::new()
            .with_decision(MockDecision::propose(test_email()))
            .with_decision(MockDecision::error("boom"));

        let first = mock.decide(&[Message::user("send it")]).await.unwrap();
        assert!(matches!(first, Decision::Propose(_)));
        assert!(mock.decide(&[]).await.is_err());
        assert_eq!(
            mock.decide(&[]).await.unwrap(),
            Decision::Reply(DEFAULT_MOCK_REPLY.to_string())
        );
        assert_eq!(mock.decide_calls(), 3);
        assert_eq!(mock.captured_histories()[0][0].content, "send it");
    }

    #[tokio::test]
    async fn test_regenerate_defaults_to_prior() {
        let mock = MockDecisionLayer::new().with_regeneration(test_email_formal());
        let prior = test_email();

        assert_eq!(mock.regenerate(&[], &prior, "more formal").await.unwrap(), test_email_formal());
        assert_eq!(mock.regenerate(&[], &prior, "again").await.unwrap(), prior);
        assert_eq!(mock.captured_instructions(), vec!["more formal", "again"]);
    }
}
