//! Configuration file loading for warden
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `WARDEN_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./warden.toml` or `./.warden.toml`
//! 4. Global: `~/.config/warden/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileConnectorConfig, FileFetchConfig, FileGuardPolicy,
    FilePolicyConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
