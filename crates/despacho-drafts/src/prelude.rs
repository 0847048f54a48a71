//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_drafts::prelude::*;` to import all essential types.

pub use crate::{DeliveryState, Draft, DraftRevision, DraftStatus, DraftStore, RevisionReason};
pub use crate::{DraftError, DraftResult};
