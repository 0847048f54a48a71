//! Payload error types.

use crate::payload::{ActionKind, PayloadField};

/// Errors raised while manipulating an action payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The corrected field does not exist on this kind of payload.
    #[error("field {field} does not apply to {kind} drafts")]
    FieldNotApplicable {
        /// The field the correction targeted.
        field: PayloadField,
        /// The kind of the payload being corrected.
        kind: ActionKind,
    },

    /// The correction could match more than one existing value.
    #[error("correction for {field} is ambiguous: {reason}")]
    AmbiguousCorrection {
        /// The field the correction targeted.
        field: PayloadField,
        /// Why no single value could be chosen.
        reason: String,
    },

    /// The replacement value is malformed for the field.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field the correction targeted.
        field: PayloadField,
        /// The rejected value.
        value: String,
    },
}

/// Result type for payload operations.
pub type PayloadResult<T> = Result<T, PayloadError>;
