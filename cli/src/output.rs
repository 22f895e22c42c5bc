//! Console output for catalogs, connector status and configuration

use colored::Colorize;
use warden_application::{CatalogEntry, ReconcileReport};
use warden_domain::{ConnectionState, ConnectorStatus, GuardPolicy, PolicyBundle};

/// Formats warden state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// One line per tool: namespaced id, then its description
    pub fn catalog(entries: &[CatalogEntry]) -> String {
        if entries.is_empty() {
            return "No tools available.".dimmed().to_string();
        }

        let width = entries
            .iter()
            .map(|e| e.id.to_string().len())
            .max()
            .unwrap_or(0);

        let mut output = Self::header(&format!("Tools ({})", entries.len()));
        for entry in entries {
            let description = entry.descriptor.description.lines().next().unwrap_or("");
            output.push_str(&format!(
                "  {:<width$}  {}\n",
                entry.id.to_string(),
                description,
                width = width
            ));
        }
        output
    }

    pub fn statuses(statuses: &[ConnectorStatus]) -> String {
        if statuses.is_empty() {
            return "No connectors configured.".dimmed().to_string();
        }

        let mut output = Self::header("Connectors");
        for status in statuses {
            let state = match status.state {
                ConnectionState::Connected => "connected".green().bold(),
                ConnectionState::Connecting => "connecting".yellow().bold(),
                ConnectionState::Failed => "failed".red().bold(),
            };
            output.push_str(&format!(
                "  {} {} [{}] {} ({} tools)\n",
                status.id.bold(),
                format!("({})", status.name).dimmed(),
                status.transport,
                state,
                status.tool_count
            ));
            if let Some(at) = status.last_connected_at {
                output.push_str(&format!("      last connected: {}\n", at.to_rfc3339()));
            }
            if let Some(error) = &status.error {
                output.push_str(&format!("      {} {}\n", "error:".red(), error));
            }
        }
        output
    }

    pub fn reconcile(report: &ReconcileReport) -> Option<String> {
        if report.unchanged || report.actions() == 0 {
            return None;
        }
        let mut parts = Vec::new();
        if !report.connected.is_empty() {
            parts.push(format!("connected: {}", report.connected.join(", ")));
        }
        if !report.failed.is_empty() {
            parts.push(format!("failed: {}", report.failed.join(", ")));
        }
        if !report.removed.is_empty() {
            parts.push(format!("removed: {}", report.removed.join(", ")));
        }
        Some(parts.join("; "))
    }

    pub fn policy(policy: &PolicyBundle) -> String {
        let mut output = Self::header("Effective policy");
        output.push_str(&Self::guard_line("filesystem", &policy.filesystem, "unrestricted"));
        output.push_str(&Self::guard_line("network", &policy.network, "unrestricted"));
        output.push_str(&Self::guard_line("command", &policy.command, "nothing allowed"));
        output
    }

    fn guard_line(label: &str, policy: &GuardPolicy, empty_meaning: &str) -> String {
        let state = if policy.enabled {
            "enabled".green()
        } else {
            "disabled".red()
        };
        let list = if policy.allow_list.is_empty() {
            format!("(empty allow-list: {})", empty_meaning)
        } else {
            policy.allow_list.join(", ")
        };
        format!("  {:<11} {:<8} {}\n", label, state, list)
    }

    fn header(title: &str) -> String {
        format!("{}\n", title.cyan().bold())
    }
}
