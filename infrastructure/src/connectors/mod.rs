//! Connector adapters
//!
//! Implements the application layer's [`ConnectorFactory`] and
//! [`ConnectorSession`] ports on top of the `rmcp` client.
//!
//! [`ConnectorFactory`]: warden_application::ConnectorFactory
//! [`ConnectorSession`]: warden_application::ConnectorSession

pub mod mcp;

pub use mcp::{DEFAULT_CALL_TIMEOUT, RmcpConnectorFactory, RmcpSession, sanitize_headers_for_transport};
