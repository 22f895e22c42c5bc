//! CLI entrypoint for warden
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden_application::{ConnectionManager, ToolInvocation, ToolRouter};
use warden_infrastructure::{ConfigLoader, FileConfig, LocalSandbox, RmcpConnectorFactory};

use commands::{Cli, Command};
use output::ConsoleFormatter;

fn init_logging(verbose: u8) {
    // RUST_LOG wins over -v when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))?
    };

    let issues = config.validate();
    if !issues.is_empty() {
        let list = issues
            .iter()
            .map(|issue| format!("  - {}", issue))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("invalid configuration:\n{}", list);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let policy = config.policy();

    if let Command::Config = cli.command {
        for line in ConfigLoader::config_sources(cli.config.as_ref()) {
            println!("{}", line);
        }
        println!();
        print!("{}", ConsoleFormatter::policy(&policy));
        println!("\n{} connector(s) configured", config.connectors.len());
        return Ok(ExitCode::SUCCESS);
    }

    info!("Starting warden");

    // === Dependency Injection ===
    let sandbox = Arc::new(LocalSandbox::with_fetch_settings(config.fetch.to_settings()));
    let manager = Arc::new(ConnectionManager::new(Arc::new(RmcpConnectorFactory::new())));
    let router = ToolRouter::new(sandbox, Arc::clone(&manager));

    let report = manager.reconcile(&config.connector_configs()).await;
    if let Some(summary) = ConsoleFormatter::reconcile(&report) {
        info!(%summary, "Reconciled connectors");
    }
    if !report.failed.is_empty() {
        warn!(failed = ?report.failed, "Some connectors failed to connect");
    }

    let outcome = run(&cli.command, &router, &manager, policy).await;
    manager.disconnect_all().await;
    outcome
}

async fn run(
    command: &Command,
    router: &ToolRouter,
    manager: &ConnectionManager,
    policy: warden_domain::PolicyBundle,
) -> Result<ExitCode> {
    match command {
        Command::Tools => {
            print!("{}", ConsoleFormatter::catalog(&router.list_capabilities().await));
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            let health = manager.health_check().await;
            if !health.unhealthy.is_empty() {
                warn!(unhealthy = ?health.unhealthy, "Health check failed for some connectors");
            }
            print!("{}", ConsoleFormatter::statuses(&manager.status().await));
            Ok(ExitCode::SUCCESS)
        }
        Command::Call {
            tool,
            params,
            render,
        } => {
            let params: Value =
                serde_json::from_str(params).context("--params must be valid JSON")?;
            let invocation =
                ToolInvocation::new(tool.as_str(), params, policy).rendered_as((*render).into());

            let outcome = router.dispatch(invocation).await?;
            println!("{}", outcome.rendered.unwrap_or_default());

            Ok(if outcome.result.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Config => Ok(ExitCode::SUCCESS),
    }
}
