//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_test::prelude::*;` to import all helpers.

pub use crate::backends::*;
pub use crate::fixtures::*;
pub use crate::harness::*;
pub use crate::mock_llm::*;
