//! Guard policy configuration from TOML (`[policy]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [policy.filesystem]
//! enabled = true
//! allow_list = ["~/projects", "/srv/data"]
//!
//! [policy.network]
//! enabled = true
//! allow_list = ["docs.rs", "github.com"]
//!
//! [policy.command]
//! enabled = true
//! allow_list = ["git", "ls", "cargo"]
//! ```
//!
//! Every field is optional. A missing section is a disabled capability.

use serde::{Deserialize, Serialize};
use warden_domain::{GuardPolicy, PolicyBundle};

/// One capability as written in the file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGuardPolicy {
    pub enabled: Option<bool>,
    pub allow_list: Option<Vec<String>>,
}

impl FileGuardPolicy {
    /// Fill defaults: disabled, empty allow-list.
    ///
    /// A leading `~/` in an entry is expanded to the home directory so
    /// filesystem allow-lists can be written portably.
    pub fn into_guard_policy(self) -> GuardPolicy {
        GuardPolicy {
            enabled: self.enabled.unwrap_or(false),
            allow_list: self
                .allow_list
                .unwrap_or_default()
                .into_iter()
                .map(|entry| expand_home(&entry))
                .collect(),
        }
    }
}

/// `[policy]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePolicyConfig {
    pub filesystem: FileGuardPolicy,
    pub network: FileGuardPolicy,
    pub command: FileGuardPolicy,
}

impl FilePolicyConfig {
    /// Fully-populated policy bundle
    pub fn into_policy(self) -> PolicyBundle {
        PolicyBundle {
            filesystem: self.filesystem.into_guard_policy(),
            network: self.network.into_guard_policy(),
            command: self.command.into_guard_policy(),
        }
    }
}

fn expand_home(entry: &str) -> String {
    match entry.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest).to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.to_string()),
        None => entry.to_string(),
    }
}
