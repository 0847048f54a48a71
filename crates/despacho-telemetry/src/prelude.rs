//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_telemetry::prelude::*;` to import all essential types.

pub use crate::{
    FileRotation, LogConfig, LogFormat, LogTarget, TelemetryError, TelemetryResult, TurnContext,
    TurnGuard, setup_logging,
};
