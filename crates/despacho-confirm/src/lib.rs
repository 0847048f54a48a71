//! Despacho Confirm - classification of replies to a pending draft.
//!
//! When a session has a draft awaiting confirmation, every reply goes through
//! the [`ConfirmationDetector`] before anything else. The detector folds the
//! text (case, diacritics, punctuation), matches it against a configurable
//! [`Lexicon`], and extracts single-field corrections, producing one
//! [`Intent`].
//!
//! ```
//! use despacho_confirm::{ConfirmationDetector, Intent};
//!
//! let detector = ConfirmationDetector::builtin();
//! assert_eq!(detector.classify("Sim!", true), Intent::Confirm);
//! assert_eq!(detector.classify("não", true), Intent::Cancel);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod correction;
pub mod detector;
pub mod intent;
pub mod lexicon;
pub mod normalize;

pub use correction::extract_correction;
pub use detector::ConfirmationDetector;
pub use intent::Intent;
pub use lexicon::Lexicon;
