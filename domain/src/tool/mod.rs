//! Tool domain module
//!
//! Core abstractions for invoking tools across the trust boundary: what a
//! tool looks like ([`ToolDescriptor`]), how it is addressed
//! ([`NamespacedToolId`]), how it is invoked ([`ToolCall`]) and what comes
//! back ([`ToolResult`]).
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ NamespacedToolId │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ local:/remote:   │    │ (invocation) │    │ (blocks)     │
//! └──────────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! This module is pure: no I/O, no async.

pub mod entities;
pub mod namespace;
pub mod traits;
pub mod value_objects;

pub use entities::{ToolCall, ToolDescriptor};
pub use namespace::{NamespaceError, NamespacedToolId, ToolOrigin};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ContentBlock, ToolError, ToolResult, ToolResultMetadata};
