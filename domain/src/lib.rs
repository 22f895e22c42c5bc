//! Domain layer for warden
//!
//! This crate contains the types that cross the trust boundary between a
//! conversational runtime and host resources. It has no dependencies on
//! infrastructure concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! - **Tool results** ([`ToolResult`]): the uniform output of every
//!   invocation, local or remote. Either content or one error block.
//! - **Namespaced ids** ([`NamespacedToolId`]): `local:<name>` or
//!   `remote:<connector>:<name>`, round-trippable to and from strings.
//! - **Policies** ([`PolicyBundle`]): per-request allow-lists for the
//!   filesystem, network and command capabilities.
//! - **Connectors** ([`ConnectorConfig`]): external tool servers and the
//!   status of their live connections.

pub mod connector;
pub mod policy;
pub mod tool;

// Re-export commonly used types
pub use connector::{
    ConnectionState, ConnectorConfig, ConnectorStatus, TransportKind, desired_set_hash,
};
pub use policy::{Capability, GuardPolicy, PolicyBundle};
pub use tool::{
    ContentBlock, DefaultToolValidator, NamespaceError, NamespacedToolId, ToolCall,
    ToolDescriptor, ToolError, ToolOrigin, ToolResult, ToolResultMetadata, ToolValidator,
};
