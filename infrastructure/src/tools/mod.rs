//! Local sandbox tools
//!
//! | Tool | Capability | Guard |
//! |------|------------|-------|
//! | `read_file` | filesystem | [`PathGuard`](crate::guard::PathGuard) |
//! | `list_directory` | filesystem | [`PathGuard`](crate::guard::PathGuard) |
//! | `fetch_url` | network | [`NetworkGuard`](crate::guard::NetworkGuard), per redirect hop |
//! | `execute_command` | command | [`CommandGuard`](crate::guard::CommandGuard) |
//!
//! [`LocalSandbox`] is the [`ToolExecutorPort`] adapter that dispatches a
//! call to the matching tool with the policy for its capability.

pub mod command;
pub mod fetch;
pub mod file;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use warden_application::ToolExecutorPort;
use warden_domain::{Capability, PolicyBundle, ToolCall, ToolDescriptor, ToolError, ToolResult};

pub use command::{DEFAULT_COMMAND_TIMEOUT, EXECUTE_COMMAND};
pub use fetch::{FETCH_URL, FetchError, FetchSettings, HttpHop, ReqwestHop};
pub use file::{LIST_DIRECTORY, READ_FILE};

/// Descriptors of every sandbox tool, in catalog order
pub fn sandbox_tools() -> Vec<ToolDescriptor> {
    vec![
        file::read_file_descriptor(),
        file::list_directory_descriptor(),
        fetch::fetch_url_descriptor(),
        command::execute_command_descriptor(),
    ]
}

/// Capability a sandbox tool draws on
pub fn capability_of(tool: &str) -> Option<Capability> {
    match tool {
        READ_FILE | LIST_DIRECTORY => Some(Capability::Filesystem),
        FETCH_URL => Some(Capability::Network),
        EXECUTE_COMMAND => Some(Capability::Command),
        _ => None,
    }
}

/// Executor for the four local tools.
///
/// # Configurations
///
/// | Constructor | HTTP transport | Use Case |
/// |-------------|----------------|----------|
/// | [`new()`](Self::new) | [`ReqwestHop`] with default settings | Normal use |
/// | [`with_fetch_settings()`](Self::with_fetch_settings) | [`ReqwestHop`] | Configured timeout / user agent |
/// | [`with_hop()`](Self::with_hop) | any [`HttpHop`] | Testing |
pub struct LocalSandbox {
    tools: Vec<ToolDescriptor>,
    hop: Arc<dyn HttpHop>,
    fetch_timeout: Duration,
    command_timeout: Duration,
}

impl LocalSandbox {
    pub fn new() -> Self {
        Self::with_fetch_settings(FetchSettings::default())
    }

    pub fn with_fetch_settings(settings: FetchSettings) -> Self {
        let timeout = settings.timeout;
        Self::with_hop(Arc::new(ReqwestHop::new(settings)), timeout)
    }

    pub fn with_hop(hop: Arc<dyn HttpHop>, fetch_timeout: Duration) -> Self {
        Self {
            tools: sandbox_tools(),
            hop,
            fetch_timeout,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

impl Default for LocalSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for LocalSandbox {
    fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn execute(&self, call: &ToolCall, policy: &PolicyBundle) -> ToolResult {
        let Some(capability) = capability_of(&call.tool_name) else {
            return ToolResult::failure(ToolError::unknown_tool(&call.tool_name));
        };
        let policy = policy.get(capability);
        debug!(tool = %call.tool_name, capability = %capability, enabled = policy.enabled, "Sandbox call");

        match call.tool_name.as_str() {
            READ_FILE => file::execute_read_file(call, policy).await,
            LIST_DIRECTORY => file::execute_list_directory(call, policy).await,
            FETCH_URL => {
                fetch::execute_fetch_url(self.hop.as_ref(), self.fetch_timeout, call, policy).await
            }
            EXECUTE_COMMAND => command::execute_command(call, policy, self.command_timeout).await,
            other => ToolResult::failure(ToolError::unknown_tool(other)),
        }
    }
}
