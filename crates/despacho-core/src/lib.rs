//! Despacho Core - shared types for the customs assistant.
//!
//! This crate holds the vocabulary every other Despacho crate speaks:
//!
//! - [`SessionId`] and [`DraftId`] identify conversations and drafts
//! - [`Timestamp`] wraps `chrono` UTC datetimes
//! - [`ActionKind`] and [`ActionPayload`] describe side-effecting actions
//!   (email send, DUIMP creation) and their kind-specific content
//! - [`FieldCorrection`] carries a single-field replacement requested by
//!   the user while a draft is awaiting confirmation
//!
//! # Example
//!
//! ```
//! use despacho_core::{ActionKind, ActionPayload, EmailDraft, FieldCorrection, PayloadField};
//!
//! let payload = ActionPayload::Email(
//!     EmailDraft::new(["alice@exmaple.com"], "Monthly report").with_body("See attached."),
//! );
//! assert_eq!(payload.kind(), ActionKind::Email);
//!
//! let fixed = payload
//!     .apply_correction(&FieldCorrection::new(PayloadField::EmailRecipient, "alice@example.com"))
//!     .unwrap();
//! assert!(fixed.preview().contains("alice@example.com"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod payload;
pub mod types;

pub use error::{PayloadError, PayloadResult};
pub use payload::{
    ActionKind, ActionPayload, DuimpDraft, EmailDraft, FieldCorrection, GenericDraft,
    PayloadField, format_cnpj, format_ncm,
};
pub use types::{DraftId, SessionId, Timestamp};
