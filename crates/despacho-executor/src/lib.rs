//! Despacho Executor - performs the side effect of a finalized draft.
//!
//! The [`ActionExecutor`] routes a `sent` draft to the backend for its kind
//! and bounds each call with a timeout. Backends:
//!
//! - [`HttpEmailRelay`] and [`HttpDeclarationApi`] for real delivery
//! - [`OutboxBackend`] for dry runs

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod backend;
pub mod error;
pub mod executor;
pub mod http;
pub mod outbox;

pub use backend::{DeclarationBackend, EmailBackend, Receipt};
pub use error::{ExecutionError, ExecutionResult};
pub use executor::{ActionExecutor, DEFAULT_TIMEOUT};
pub use http::{HttpDeclarationApi, HttpEmailRelay};
pub use outbox::OutboxBackend;
