//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_core::prelude::*;` to import all essential types.

// Identifiers & time
pub use crate::{DraftId, SessionId, Timestamp};

// Payloads
pub use crate::{ActionKind, ActionPayload, DuimpDraft, EmailDraft, GenericDraft};

// Corrections
pub use crate::{FieldCorrection, PayloadField};

// Errors
pub use crate::{PayloadError, PayloadResult};
