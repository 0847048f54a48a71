//! Despacho Drafts - versioned drafts of side-effecting actions.
//!
//! A draft is proposed once, revised any number of times while it is
//! `pending`, and then either finalized (`sent`) or cancelled. Every revision
//! is kept for audit. Finalization happens at most once: a second attempt
//! yields [`DraftError::AlreadyFinalized`], which callers treat as an
//! idempotent no-op.
//!
//! ```text
//!            revise
//!           ┌──────┐
//!           ▼      │
//! create ─► pending ─┬─ finalize ─► sent ── record_delivered / record_failed
//!                    └─ cancel ───► cancelled
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod draft;
pub mod error;
pub mod store;

pub use draft::{DeliveryState, Draft, DraftRevision, DraftStatus, RevisionReason};
pub use error::{DraftError, DraftResult};
pub use store::DraftStore;
