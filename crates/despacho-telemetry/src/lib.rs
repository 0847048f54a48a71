//! Despacho Telemetry - logging setup and per-turn tracing context.
//!
//! This crate provides:
//! - [`setup_logging`], installing a `tracing` subscriber from a [`LogConfig`]
//! - [`TurnContext`], correlation data for one conversational turn
//!
//! # Example
//!
//! ```rust,no_run
//! use despacho_telemetry::{LogConfig, LogFormat, TurnContext, setup_logging};
//!
//! # fn main() -> Result<(), despacho_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("despacho_runtime=debug");
//! setup_logging(&config)?;
//!
//! let ctx = TurnContext::new("cli")
//!     .with_session("chat-42")
//!     .with_operation("handle_turn");
//! let _guard = ctx.span().entered();
//! tracing::info!("turn started");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{TurnContext, TurnGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
