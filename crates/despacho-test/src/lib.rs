//! Despacho Test - shared test utilities.
//!
//! Scripted decision layers, recording delivery backends and payload
//! fixtures, used by the other crates as a dev-dependency.
//!
//! ```rust,ignore
//! use despacho_test::prelude::*;
//!
//! let decisions = MockDecisionLayer::new()
//!     .with_decision(MockDecision::propose(test_email()));
//! let email = RecordingEmailBackend::new();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod backends;
pub mod fixtures;
pub mod harness;
pub mod mock_llm;

pub use backends::*;
pub use fixtures::*;
pub use harness::*;
pub use mock_llm::*;
