//! The decision layer seam.

use async_trait::async_trait;
use despacho_core::ActionPayload;

use crate::error::LlmResult;
use crate::types::{Decision, Message};

/// Decides what to do with a turn that is not a reply to a pending draft,
/// and regenerates draft payloads on request.
#[async_trait]
pub trait DecisionLayer: Send + Sync {
    /// Name, for logs.
    fn name(&self) -> &str;

    /// Answer the latest user message in `history`, or propose an action.
    async fn decide(&self, history: &[Message]) -> LlmResult<Decision>;

    /// Produce a new payload of the same kind as `prior`, following
    /// `instruction`.
    async fn regenerate(
        &self,
        history: &[Message],
        prior: &ActionPayload,
        instruction: &str,
    ) -> LlmResult<ActionPayload>;
}
