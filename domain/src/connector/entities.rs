//! Connector configuration entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Transport used to reach a tool server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Child process speaking over stdin/stdout
    Stdio,
    /// Legacy server-sent-events endpoint
    Sse,
    /// Streamable HTTP endpoint
    StreamableHttp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::StreamableHttp => "streamable-http",
        }
    }

    /// Whether this transport is addressed by URL rather than by command
    pub fn is_http(&self) -> bool {
        !matches!(self, TransportKind::Stdio)
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and transport descriptor for one remote tool server.
///
/// Maps are `BTreeMap` so that hashing is independent of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub transport: TransportKind,
    /// Executable for stdio transports
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Endpoint for HTTP transports
    pub url: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
}

impl ConnectorConfig {
    pub fn stdio(id: impl Into<String>, command: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            enabled: true,
            transport: TransportKind::Stdio,
            command: Some(command.into()),
            args: Vec::new(),
            url: None,
            headers: BTreeMap::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn http(id: impl Into<String>, transport: TransportKind, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            enabled: true,
            transport,
            command: None,
            args: Vec::new(),
            url: Some(url.into()),
            headers: BTreeMap::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether two configs describe the same connection.
    ///
    /// `name` is display-only and does not participate.
    pub fn same_identity(&self, other: &ConnectorConfig) -> bool {
        self.identity_fingerprint() == other.identity_fingerprint()
    }

    fn hash_identity<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.enabled.hash(state);
        self.transport.hash(state);
        self.command.hash(state);
        self.args.hash(state);
        self.url.hash(state);
        self.headers.hash(state);
        self.env.hash(state);
    }

    pub fn identity_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_identity(&mut hasher);
        hasher.finish()
    }
}

/// Content hash over the identity-relevant fields of a desired config set.
///
/// Order-independent: configs are hashed sorted by id.
pub fn desired_set_hash(configs: &[ConnectorConfig]) -> u64 {
    let mut sorted: Vec<&ConnectorConfig> = configs.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = DefaultHasher::new();
    sorted.len().hash(&mut hasher);
    for config in sorted {
        config.hash_identity(&mut hasher);
    }
    hasher.finish()
}
