//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! [`FileConfig::validate`] is the boundary check; after it passes,
//! [`FileConfig::policy`] and [`FileConfig::connector_configs`] hand the
//! core fully-populated domain types.

mod connectors;
mod policy;

pub use connectors::FileConnectorConfig;
pub use policy::{FileGuardPolicy, FilePolicyConfig};

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_domain::{ConnectorConfig, PolicyBundle};

use crate::tools::fetch::{DEFAULT_FETCH_TIMEOUT, DEFAULT_USER_AGENT, FetchSettings};

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("fetch.timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("connector id cannot be empty")]
    EmptyConnectorId,

    #[error("connector id '{0}' cannot contain ':'")]
    InvalidConnectorId(String),

    #[error("duplicate connector id '{0}'")]
    DuplicateConnectorId(String),

    #[error("stdio connector '{0}' needs a command")]
    MissingCommand(String),

    #[error("{transport} connector '{id}' needs a url")]
    MissingUrl { id: String, transport: String },
}

/// `[fetch]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFetchConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for FileFetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_FETCH_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FileFetchConfig {
    pub fn to_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Per-capability guard policies
    pub policy: FilePolicyConfig,
    /// Fetch tool settings
    pub fetch: FileFetchConfig,
    /// External tool servers
    pub connectors: Vec<FileConnectorConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.fetch.timeout_seconds == 0 {
            issues.push(ConfigValidationError::InvalidTimeout);
        }

        let mut seen = HashSet::new();
        for connector in &self.connectors {
            let id = connector.id.trim();
            if id.is_empty() {
                issues.push(ConfigValidationError::EmptyConnectorId);
                continue;
            }
            if id.contains(':') {
                issues.push(ConfigValidationError::InvalidConnectorId(id.to_string()));
            }
            if !seen.insert(id) {
                issues.push(ConfigValidationError::DuplicateConnectorId(id.to_string()));
            }

            if connector.transport.is_http() {
                if connector.url.as_deref().is_none_or(|u| u.trim().is_empty()) {
                    issues.push(ConfigValidationError::MissingUrl {
                        id: id.to_string(),
                        transport: connector.transport.to_string(),
                    });
                }
            } else if connector.command.as_deref().is_none_or(|c| c.trim().is_empty()) {
                issues.push(ConfigValidationError::MissingCommand(id.to_string()));
            }
        }

        issues
    }

    /// Fully-populated policy bundle
    pub fn policy(&self) -> PolicyBundle {
        self.policy.clone().into_policy()
    }

    pub fn connector_configs(&self) -> Vec<ConnectorConfig> {
        self.connectors
            .iter()
            .map(FileConnectorConfig::to_connector_config)
            .collect()
    }
}
