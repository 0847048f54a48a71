//! Conversation and tool types.

use despacho_core::ActionPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role.
    pub role: MessageRole,
    /// Plain-text content.
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions.
    System,
    /// The user.
    User,
    /// The assistant.
    Assistant,
}

/// A tool call from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Arguments (JSON object).
    pub arguments: Value,
}

/// A tool offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: Value,
}

/// A side-effecting action proposed by the decision layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Initial payload of the draft.
    pub payload: ActionPayload,
    /// Optional text the model sent alongside the tool call.
    pub note: Option<String>,
}

impl Proposal {
    /// Create a proposal without a note.
    #[must_use]
    pub fn new(payload: ActionPayload) -> Self {
        Self {
            payload,
            note: None,
        }
    }
}

/// Outcome of one decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A plain answer; nothing to confirm.
    Reply(String),
    /// A side-effecting action that needs confirmation.
    Propose(Proposal),
}
