//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_executor::prelude::*;` to import all essential types.

pub use crate::{ActionExecutor, DeclarationBackend, EmailBackend, Receipt};
pub use crate::{ExecutionError, ExecutionResult};
pub use crate::{HttpDeclarationApi, HttpEmailRelay, OutboxBackend};
