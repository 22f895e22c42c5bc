//! Tool Executor port
//!
//! Defines the interface for the local sandbox (file, directory, fetch and
//! command tools).

use async_trait::async_trait;
use warden_domain::{PolicyBundle, ToolCall, ToolDescriptor, ToolResult};

/// Port for local tool execution
///
/// Implementations live in the infrastructure layer. The policy is passed
/// with every call: executors hold no policy state of their own.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Statically declared tools
    fn tools(&self) -> &[ToolDescriptor];

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.tools().iter().any(|t| t.name == name)
    }

    /// Get the descriptor of a specific tool
    fn get_tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools().iter().find(|t| t.name == name)
    }

    /// Execute a tool call under the given policy.
    ///
    /// Never fails past this boundary: every failure is an error-flagged
    /// [`ToolResult`].
    async fn execute(&self, call: &ToolCall, policy: &PolicyBundle) -> ToolResult;
}
