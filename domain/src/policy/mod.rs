//! Guard policies supplied per request
//!
//! The core holds no policy state of its own: every sandbox invocation is
//! evaluated against the [`PolicyBundle`] passed in with it.
//!
//! # Empty allow-lists
//!
//! | Capability | Empty allow-list means |
//! |------------|------------------------|
//! | filesystem | no restriction |
//! | network    | no restriction (SSRF checks still apply) |
//! | command    | everything denied |
//!
//! Shell execution has no unrestricted mode; each command must be listed.

use serde::{Deserialize, Serialize};

/// The three guarded capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Filesystem,
    Network,
    Command,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Filesystem => "filesystem",
            Capability::Network => "network",
            Capability::Command => "command",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-capability policy: on/off plus an allow-list of paths, domains or commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardPolicy {
    pub enabled: bool,
    pub allow_list: Vec<String>,
}

impl GuardPolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn allow(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled: true,
            allow_list: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Enabled with an empty allow-list
    pub fn unrestricted() -> Self {
        Self {
            enabled: true,
            allow_list: Vec::new(),
        }
    }
}

/// Fully-populated policy for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBundle {
    pub filesystem: GuardPolicy,
    pub network: GuardPolicy,
    pub command: GuardPolicy,
}

impl PolicyBundle {
    pub fn get(&self, capability: Capability) -> &GuardPolicy {
        match capability {
            Capability::Filesystem => &self.filesystem,
            Capability::Network => &self.network,
            Capability::Command => &self.command,
        }
    }

    pub fn with(mut self, capability: Capability, policy: GuardPolicy) -> Self {
        match capability {
            Capability::Filesystem => self.filesystem = policy,
            Capability::Network => self.network = policy,
            Capability::Command => self.command = policy,
        }
        self
    }
}
