//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_config::prelude::*;` to import all essential types.

pub use crate::{Config, ConfigError, ConfigLayer, ConfigResult, ResolvedConfig, ShowFormat};

pub use crate::{
    ConfirmationSection, ExecutorSection, LoggingSection, ModelSection, SessionsSection,
    StorageSection,
};
