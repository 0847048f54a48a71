//! The closed set of interpretations of a reply to a pending draft.

use std::fmt;

use despacho_core::FieldCorrection;
use serde::{Deserialize, Serialize};

/// What the user meant by a reply while a draft awaits confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Execute the pending draft.
    Confirm,
    /// Cancel the pending draft.
    Cancel,
    /// Regenerate the payload following the user's instruction.
    Revise {
        /// The user's words, passed to the decision layer.
        instruction: String,
    },
    /// Replace one field and keep everything else.
    Correct(FieldCorrection),
    /// Not a reply to the draft; the pending action is abandoned.
    Unrelated,
}

impl Intent {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Revise { .. } => "revise",
            Self::Correct(_) => "correct",
            Self::Unrelated => "unrelated",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct(correction) => write!(f, "correct({})", correction.field),
            other => f.write_str(other.label()),
        }
    }
}
