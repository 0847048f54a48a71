//! Despacho LLM - the tool-calling decision layer.
//!
//! A [`DecisionLayer`] looks at a session's history and either answers in
//! text or proposes a side-effecting action through a tool call
//! (`send_email`, `create_duimp`). It also regenerates a draft's payload when
//! the user asks for an improvement. [`OpenAiCompatDecisionLayer`] implements
//! it against any OpenAI-compatible chat-completions endpoint.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod decision;
pub mod error;
pub mod openai_compat;
pub mod tools;
pub mod types;

pub use decision::DecisionLayer;
pub use error::{LlmError, LlmResult};
pub use openai_compat::{DEFAULT_SYSTEM_PROMPT, OpenAiCompatDecisionLayer};
pub use types::{Decision, Message, MessageRole, Proposal, ToolCall, ToolDefinition};
