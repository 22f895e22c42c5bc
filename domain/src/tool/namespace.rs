//! Namespaced tool identifiers
//!
//! Every tool in the aggregated catalog is addressed by its origin plus its
//! name:
//!
//! ```text
//! local:read_file
//! remote:github:create_issue
//!        ^^^^^^ connector id (never contains ':')
//! ```
//!
//! Connector ids are validated at the configuration boundary to exclude
//! `:`, so the first separator after `remote:` always ends the id and the
//! tool name may itself contain colons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LOCAL_PREFIX: &str = "local";
pub const REMOTE_PREFIX: &str = "remote";

/// Where a tool lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", content = "connector_id", rename_all = "lowercase")]
pub enum ToolOrigin {
    /// Built into the local sandbox
    Local,
    /// Served by the connector with this id
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("tool id has no origin prefix: {0}")]
    MissingPrefix(String),

    #[error("unknown origin prefix '{0}'")]
    UnknownPrefix(String),

    #[error("remote tool id is missing a connector id: {0}")]
    MissingConnector(String),

    #[error("tool id has an empty tool name: {0}")]
    EmptyName(String),
}

/// Fully-qualified tool identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespacedToolId {
    pub origin: ToolOrigin,
    pub name: String,
}

impl NamespacedToolId {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            origin: ToolOrigin::Local,
            name: name.into(),
        }
    }

    pub fn remote(connector_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            origin: ToolOrigin::Remote(connector_id.into()),
            name: name.into(),
        }
    }

    pub fn connector_id(&self) -> Option<&str> {
        match &self.origin {
            ToolOrigin::Local => None,
            ToolOrigin::Remote(id) => Some(id),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.origin, ToolOrigin::Local)
    }

    /// Parse a display string back into an id.
    ///
    /// Requires an explicit prefix; bare names are resolved by the router,
    /// not here.
    pub fn parse(raw: &str) -> Result<Self, NamespaceError> {
        let (prefix, rest) = raw
            .split_once(':')
            .ok_or_else(|| NamespaceError::MissingPrefix(raw.to_string()))?;

        match prefix {
            LOCAL_PREFIX => {
                if rest.is_empty() {
                    return Err(NamespaceError::EmptyName(raw.to_string()));
                }
                Ok(Self::local(rest))
            }
            REMOTE_PREFIX => {
                let (connector, name) = rest
                    .split_once(':')
                    .ok_or_else(|| NamespaceError::MissingConnector(raw.to_string()))?;
                if connector.is_empty() {
                    return Err(NamespaceError::MissingConnector(raw.to_string()));
                }
                if name.is_empty() {
                    return Err(NamespaceError::EmptyName(raw.to_string()));
                }
                Ok(Self::remote(connector, name))
            }
            other => Err(NamespaceError::UnknownPrefix(other.to_string())),
        }
    }
}

impl fmt::Display for NamespacedToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            ToolOrigin::Local => write!(f, "{}:{}", LOCAL_PREFIX, self.name),
            ToolOrigin::Remote(id) => write!(f, "{}:{}:{}", REMOTE_PREFIX, id, self.name),
        }
    }
}

impl FromStr for NamespacedToolId {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
