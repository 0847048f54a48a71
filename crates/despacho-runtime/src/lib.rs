//! Despacho Runtime - the conversation turn controller.
//!
//! [`TurnController`] ties the pieces together. Every user turn first
//! consults the [`PendingActionRegister`]: with nothing pending the turn
//! goes to the decision layer, which may propose an action; with a draft
//! pending the reply is classified and the draft is confirmed, cancelled,
//! revised or corrected. Nothing is executed without an explicit
//! confirmation, and a confirmed draft is executed at most once.
//!
//! # Example
//!
//! ```rust,ignore
//! use despacho_runtime::prelude::*;
//!
//! let controller = TurnController::new(drafts, decisions, executor);
//! let outcome = controller.handle_turn(&session, "email x@y.com about the meeting").await;
//! if outcome.awaiting_confirmation {
//!     println!("{}", outcome.response_text);
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod config_bridge;
mod controller;
pub mod error;
pub mod outcome;
pub mod register;
pub mod session;

pub use controller::{CONFIRM_PROMPT, TurnController};
pub use error::{RuntimeError, RuntimeResult};
pub use outcome::{TurnOutcome, TurnStatus};
pub use register::{PendingAction, PendingActionRegister};
pub use session::{ConversationHistory, DEFAULT_HISTORY_LIMIT, DEFAULT_IDLE_TIMEOUT};
