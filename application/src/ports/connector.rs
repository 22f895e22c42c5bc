//! Connector ports
//!
//! The tool-server wire protocol is provided by an external client library.
//! These traits are the narrow capability-discovery/call interface the
//! [`ConnectionManager`](crate::use_cases::connection_manager::ConnectionManager)
//! needs from it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use warden_domain::{ConnectorConfig, ToolDescriptor, ToolError, ToolResult};

/// Errors from connector transports and the connection manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("Connector not found: {0}")]
    NotFound(String),

    #[error("Connector not connected: {0}")]
    NotConnected(String),

    #[error("Invalid connector configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connector timed out: {0}")]
    Timeout(String),
}

impl ConnectorError {
    /// Map onto the tool error taxonomy used at the router boundary
    pub fn to_tool_error(&self) -> ToolError {
        match self {
            ConnectorError::NotFound(_) => ToolError::new(ToolError::NOT_FOUND, self.to_string()),
            ConnectorError::NotConnected(id) => ToolError::not_connected(id),
            ConnectorError::InvalidConfig(_) => ToolError::validation_failed(self.to_string()),
            ConnectorError::Timeout(_) => ToolError::timeout(self.to_string()),
            ConnectorError::Connection(_) | ConnectorError::Protocol(_) => {
                ToolError::execution_failed(self.to_string())
            }
        }
    }
}

/// One established connection to a tool server
#[async_trait]
pub trait ConnectorSession: Send + Sync {
    /// Discover the tools the server currently offers
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ConnectorError>;

    /// Invoke a tool; a tool-level failure is an error-flagged `ToolResult`,
    /// a transport failure is `Err`
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, ConnectorError>;

    /// Shut the connection down. Must be safe to call more than once.
    async fn close(&self) -> Result<(), ConnectorError>;
}

/// Opens sessions for connector configs, one transport kind or many
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn connect(
        &self,
        config: &ConnectorConfig,
    ) -> Result<Arc<dyn ConnectorSession>, ConnectorError>;
}
