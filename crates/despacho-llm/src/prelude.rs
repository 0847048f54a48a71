//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_llm::prelude::*;` to import all essential types.

pub use crate::{Decision, DecisionLayer, Message, MessageRole, Proposal};
pub use crate::{LlmError, LlmResult};
pub use crate::OpenAiCompatDecisionLayer;
