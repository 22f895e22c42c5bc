//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use warden_application::RenderTarget;

/// How `call` prints its result
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum RenderFormat {
    /// Flattened text, as a model would see it
    #[default]
    Text,
    /// The full result, metadata included, as JSON
    Json,
}

impl From<RenderFormat> for RenderTarget {
    fn from(format: RenderFormat) -> Self {
        match format {
            RenderFormat::Text => RenderTarget::Text,
            RenderFormat::Json => RenderTarget::Json,
        }
    }
}

/// CLI arguments for warden
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about = "Guarded local tools and tool-server connectors")]
#[command(long_about = r#"
warden runs tool invocations behind allow-list guards.

Local tools (read_file, list_directory, fetch_url, execute_command) are
checked against the [policy] section of the configuration. Remote tools
come from the tool servers listed under [[connectors]].

Configuration files are loaded from (in priority order):
1. WARDEN_* environment variables
2. --config <path>     Explicit config file
3. ./warden.toml       Project-level config
4. ~/.config/warden/config.toml   Global config

Example:
  warden tools
  warden call read_file --params '{"path": "Cargo.toml"}'
  warden call remote:github:search_issues --params '{"query": "bug"}' --render json
  warden status
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every available tool with its namespaced id
    Tools,

    /// Invoke one tool
    Call {
        /// `read_file`, `local:read_file` or `remote:<connector>:<tool>`
        tool: String,

        /// Tool parameters as a JSON object
        #[arg(short, long, value_name = "JSON", default_value = "{}")]
        params: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        render: RenderFormat,
    },

    /// Connect configured tool servers and report their health
    Status,

    /// Show configuration file locations and the effective policy
    Config,
}
