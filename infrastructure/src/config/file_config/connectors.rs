//! Connector configuration from TOML (`[[connectors]]` array)
//!
//! Example configuration:
//!
//! ```toml
//! [[connectors]]
//! id = "github"
//! name = "GitHub"
//! command = "github-mcp-server"
//! args = ["stdio"]
//! env = { GITHUB_TOKEN = "ghp_..." }
//!
//! [[connectors]]
//! id = "search"
//! transport = "streamable-http"
//! url = "https://tools.example.com/mcp"
//! headers = { Authorization = "Bearer ..." }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_domain::{ConnectorConfig, TransportKind};

fn default_true() -> bool {
    true
}

fn default_transport() -> TransportKind {
    TransportKind::Stdio
}

/// One `[[connectors]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConnectorConfig {
    pub id: String,
    /// Display name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl FileConnectorConfig {
    pub fn to_connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            enabled: self.enabled,
            transport: self.transport,
            command: self.command.clone(),
            args: self.args.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            env: self.env.clone(),
        }
    }
}
