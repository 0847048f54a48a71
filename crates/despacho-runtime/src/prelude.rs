//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_runtime::prelude::*;` to import all essential types.

pub use crate::{
    CONFIRM_PROMPT, ConversationHistory, PendingAction, PendingActionRegister, RuntimeError,
    RuntimeResult, TurnController, TurnOutcome, TurnStatus,
};
