//! Infrastructure layer for warden
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the guards and local sandbox tools, content
//! normalization, the rmcp connector factory and configuration loading.

pub mod config;
pub mod connectors;
pub mod content;
pub mod guard;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use connectors::RmcpConnectorFactory;
pub use content::{ContentKind, ContentNormalizer, NormalizedContent};
pub use guard::{CommandGuard, GuardError, NetworkGuard, ParsedCommand, PathGuard, ValidatedUrl};
pub use tools::{FetchSettings, LocalSandbox, sandbox_tools};
