//! Port definitions
//!
//! Interfaces the application layer needs from the outside world. Adapters
//! live in the infrastructure layer.

pub mod connector;
pub mod tool_executor;
