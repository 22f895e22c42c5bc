//! Command guard: allow-listed argv parsing
//!
//! Commands are never run through a shell. The guard turns a command line
//! into an argv vector and rejects anything that would only make sense to
//! a shell, so an allow-listed program cannot be turned into a pipeline.

use tracing::{debug, warn};
use warden_domain::{Capability, GuardPolicy};

use super::GuardError;

/// Characters that are rejected anywhere in an argument
pub const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '(', ')', '{', '}', '<', '>', '\n', '\\',
];

/// A command line split into program and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: String,
    pub args: Vec<String>,
}

pub struct CommandGuard;

impl CommandGuard {
    /// Tokenize `command_line` and check it against `allow_list`.
    ///
    /// An empty allow-list rejects everything. The program must match an
    /// entry exactly.
    pub fn parse_and_validate(
        command_line: &str,
        allow_list: &[String],
    ) -> Result<ParsedCommand, GuardError> {
        if allow_list.is_empty() {
            return Err(GuardError::NoCommandsAllowed);
        }

        let mut tokens = tokenize(command_line)?.into_iter();
        let command = tokens.next().ok_or(GuardError::EmptyCommand)?;
        if command.is_empty() {
            return Err(GuardError::EmptyCommand);
        }

        if !allow_list.iter().any(|allowed| allowed == &command) {
            warn!(command = %command, "Command not in allow-list");
            return Err(GuardError::CommandNotAllowed(command));
        }

        let args: Vec<String> = tokens.collect();
        if let Some(arg) = args.iter().find(|a| a.contains(SHELL_METACHARACTERS)) {
            warn!(command = %command, "Rejected argument with shell metacharacter");
            return Err(GuardError::Metacharacter(arg.clone()));
        }

        debug!(command = %command, args = args.len(), "Command validated");
        Ok(ParsedCommand { command, args })
    }

    /// Apply a command policy
    pub fn check(command_line: &str, policy: &GuardPolicy) -> Result<ParsedCommand, GuardError> {
        if !policy.enabled {
            return Err(GuardError::Disabled(Capability::Command));
        }
        Self::parse_and_validate(command_line, &policy.allow_list)
    }
}

/// Split on unquoted whitespace. Quotes group and are stripped; adjacent
/// quoted and unquoted runs join into one token (`a"b c"` is `ab c`).
fn tokenize(input: &str) -> Result<Vec<String>, GuardError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_token = true;
                }
                c if c.is_whitespace() && c != '\n' => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(GuardError::UnbalancedQuotes);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_command() {
        let parsed = CommandGuard::parse_and_validate("git status", &allow(&["git"])).unwrap();
        assert_eq!(
            parsed,
            ParsedCommand {
                command: "git".into(),
                args: vec!["status".into()],
            }
        );
    }

    #[test]
    fn test_injection_rejected() {
        let list = allow(&["git", "ls"]);
        for line in [
            "git status; rm -rf /",
            "git log | sh",
            "ls `whoami`",
            "ls $(id)",
            "ls a&&b",
            "ls > out",
            "ls \\x",
            "git log {a,b}",
        ] {
            assert!(
                matches!(
                    CommandGuard::parse_and_validate(line, &list),
                    Err(GuardError::Metacharacter(_))
                ),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn test_quoted_metacharacter_still_rejected() {
        assert!(matches!(
            CommandGuard::parse_and_validate("git commit -m 'a; b'", &allow(&["git"])),
            Err(GuardError::Metacharacter(_))
        ));
    }

    #[test]
    fn test_newline_rejected() {
        let result = CommandGuard::parse_and_validate("git status\nrm -rf /", &allow(&["git"]));
        assert!(matches!(result, Err(GuardError::Metacharacter(_))));
    }

    #[test]
    fn test_quotes_group_and_strip() {
        let parsed = CommandGuard::parse_and_validate(
            r#"git commit -m "fix the bug" --author='A B'"#,
            &allow(&["git"]),
        )
        .unwrap();
        assert_eq!(
            parsed.args,
            vec!["commit", "-m", "fix the bug", "--author=A B"]
        );
    }

    #[test]
    fn test_empty_quoted_argument_is_kept() {
        let parsed = CommandGuard::parse_and_validate("echo ''", &allow(&["echo"])).unwrap();
        assert_eq!(parsed.args, vec![String::new()]);
    }

    #[test]
    fn test_unbalanced_quotes() {
        assert_eq!(
            CommandGuard::parse_and_validate("echo \"oops", &allow(&["echo"])),
            Err(GuardError::UnbalancedQuotes)
        );
    }

    #[test]
    fn test_allow_list_is_exact() {
        let list = allow(&["git"]);
        assert!(matches!(
            CommandGuard::parse_and_validate("/usr/bin/git status", &list),
            Err(GuardError::CommandNotAllowed(_))
        ));
        assert!(matches!(
            CommandGuard::parse_and_validate("gitk", &list),
            Err(GuardError::CommandNotAllowed(_))
        ));
    }

    #[test]
    fn test_empty_allow_list_denies() {
        assert_eq!(
            CommandGuard::parse_and_validate("ls", &[]),
            Err(GuardError::NoCommandsAllowed)
        );
    }

    #[test]
    fn test_blank_command() {
        assert_eq!(
            CommandGuard::parse_and_validate("   ", &allow(&["ls"])),
            Err(GuardError::EmptyCommand)
        );
    }

    #[test]
    fn test_check_disabled() {
        assert_eq!(
            CommandGuard::check("ls", &GuardPolicy::disabled()),
            Err(GuardError::Disabled(Capability::Command))
        );
    }
}
