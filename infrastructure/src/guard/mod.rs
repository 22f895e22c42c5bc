//! Guards: the allow/deny decisions for paths, URLs and commands
//!
//! Each guard is a pure decision over its input and the request's
//! [`GuardPolicy`](warden_domain::GuardPolicy); none of them performs the
//! guarded operation itself. The sandbox calls a guard first and only acts
//! on what the guard hands back (a canonical path, a [`ValidatedUrl`], a
//! [`ParsedCommand`]).

pub mod command;
pub mod network;
pub mod path;

pub use command::{CommandGuard, ParsedCommand};
pub use network::{NetworkGuard, ValidatedUrl};
pub use path::PathGuard;

use thiserror::Error;
use warden_domain::{Capability, ToolError};

/// Why a guard refused its input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("{} access is disabled", capability_label(.0))]
    Disabled(Capability),

    #[error("Path is outside the allowed directories: {0}")]
    PathNotAllowed(String),

    #[error("Domain is not in the allow-list: {0}")]
    DomainNotAllowed(String),

    #[error("Command is not in the allow-list: {0}")]
    CommandNotAllowed(String),

    #[error("No commands are allowed: the command allow-list is empty")]
    NoCommandsAllowed,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme '{0}': only http and https are allowed")]
    UnsupportedScheme(String),

    #[error("URL targets a private or reserved address: {0}")]
    PrivateAddress(String),

    #[error("Could not resolve host: {0}")]
    Unresolved(String),

    #[error("Empty command")]
    EmptyCommand,

    #[error("Unbalanced quotes in command")]
    UnbalancedQuotes,

    #[error("Argument contains a shell metacharacter: {0}")]
    Metacharacter(String),
}

fn capability_label(capability: &Capability) -> &'static str {
    match capability {
        Capability::Filesystem => "Filesystem",
        Capability::Network => "Network",
        Capability::Command => "Command execution",
    }
}

impl GuardError {
    pub fn is_policy_denial(&self) -> bool {
        matches!(
            self,
            GuardError::Disabled(_)
                | GuardError::PathNotAllowed(_)
                | GuardError::DomainNotAllowed(_)
                | GuardError::CommandNotAllowed(_)
                | GuardError::NoCommandsAllowed
        )
    }

    pub fn to_tool_error(&self) -> ToolError {
        if self.is_policy_denial() {
            ToolError::policy_denied(self.to_string())
        } else {
            ToolError::validation_failed(self.to_string())
        }
    }
}

impl From<GuardError> for ToolError {
    fn from(err: GuardError) -> Self {
        err.to_tool_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_message() {
        assert_eq!(
            GuardError::Disabled(Capability::Filesystem).to_string(),
            "Filesystem access is disabled"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GuardError::PathNotAllowed("/etc".into()).to_tool_error().code,
            ToolError::POLICY_DENIED
        );
        assert_eq!(
            GuardError::PrivateAddress("127.0.0.1".into()).to_tool_error().code,
            ToolError::VALIDATION_FAILED
        );
        assert_eq!(
            GuardError::UnbalancedQuotes.to_tool_error().code,
            ToolError::VALIDATION_FAILED
        );
    }
}
