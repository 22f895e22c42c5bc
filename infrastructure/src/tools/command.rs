//! Command execution tool: execute_command
//!
//! The command line is split by [`CommandGuard`] and run as an argv vector.
//! No shell is ever involved.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};
use warden_domain::{GuardPolicy, ToolCall, ToolDescriptor, ToolError, ToolResult, ToolResultMetadata};

use crate::guard::CommandGuard;

/// Tool name constant
pub const EXECUTE_COMMAND: &str = "execute_command";

/// Default timeout for command execution (30 seconds)
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum output kept per stream (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

const TRUNCATION_MARKER: &str = "\n... (output truncated)";

pub fn execute_command_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        EXECUTE_COMMAND,
        "Run an allow-listed command without a shell and return its stdout, stderr and exit code",
    )
    .with_parameter(
        "command",
        "string",
        "Command line, e.g. `git status`. Quotes group arguments; pipes and redirection are rejected.",
        true,
    )
}

/// Captured output of one stream
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Read a stream to the end, keeping at most [`MAX_OUTPUT_SIZE`] bytes.
///
/// The rest is drained and dropped so the child never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Captured> {
    let mut captured = Captured {
        bytes: Vec::new(),
        truncated: false,
    };
    let Some(mut stream) = stream else {
        return Ok(captured);
    };

    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = MAX_OUTPUT_SIZE - captured.bytes.len();
        if n > room {
            captured.bytes.extend_from_slice(&chunk[..room]);
            captured.truncated = true;
        } else {
            captured.bytes.extend_from_slice(&chunk[..n]);
        }
    }
    Ok(captured)
}

/// Execute the execute_command tool
pub async fn execute_command(call: &ToolCall, policy: &GuardPolicy, timeout: Duration) -> ToolResult {
    let start = Instant::now();

    let command_line = match call.require_string("command") {
        Ok(c) => c,
        Err(e) => return ToolResult::failure(ToolError::invalid_argument(e)),
    };

    let parsed = match CommandGuard::check(command_line, policy) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(e.into()),
    };

    let program = match which::which(&parsed.command) {
        Ok(p) => p,
        Err(_) => {
            return ToolResult::failure(ToolError::not_found(format!(
                "'{}' is not installed or not on PATH",
                parsed.command
            )));
        }
    };

    let mut child = match tokio::process::Command::new(&program)
        .args(&parsed.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            return ToolResult::failure(ToolError::execution_failed(format!(
                "Failed to spawn '{}': {}",
                parsed.command, e
            )));
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let run = async {
        let (out, err, status) = tokio::join!(read_capped(stdout), read_capped(stderr), child.wait());
        Ok::<_, std::io::Error>((out?, err?, status?))
    };

    let outcome = tokio::time::timeout(timeout, run).await;
    let (stdout, stderr, status) = match outcome {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return ToolResult::failure(ToolError::execution_failed(format!(
                "Failed to run '{}': {}",
                parsed.command, e
            )));
        }
        Err(_) => {
            let _ = child.kill().await;
            warn!(command = %parsed.command, timeout_secs = timeout.as_secs_f64(), "Command timed out");
            return ToolResult::failure(ToolError::timeout(format!(
                "Command timed out after {:?}: {}",
                timeout, command_line
            )));
        }
    };

    let exit_code = status.code().unwrap_or(-1);
    info!(command = %parsed.command, exit_code, "Command finished");

    let mut output = String::new();
    if !status.success() {
        output.push_str(&format!("Command exited with code {}\n", exit_code));
    }
    output.push_str(&stdout.text());
    if !stderr.bytes.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str("--- stderr ---\n");
        output.push_str(&stderr.text());
    }
    if output.is_empty() {
        output.push_str("(no output)");
    }

    // A non-zero exit is still a successful tool call; the caller decides
    let metadata = ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(stdout.bytes.len() + stderr.bytes.len()),
        truncated: stdout.truncated || stderr.truncated,
        exit_code: Some(exit_code),
        ..Default::default()
    };
    ToolResult::success(output).with_metadata(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> ToolCall {
        ToolCall::new(EXECUTE_COMMAND).with_arg("command", line)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo() {
        let result = execute_command(
            &run("echo hello 'big world'"),
            &GuardPolicy::allow(["echo"]),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await;

        assert!(result.is_success());
        assert_eq!(result.text(), "hello big world\n");
        assert_eq!(result.metadata().exit_code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let result = execute_command(
            &run("ls /definitely/not/a/real/dir"),
            &GuardPolicy::allow(["ls"]),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await;

        assert!(result.is_success());
        let text = result.text();
        assert!(text.starts_with("Command exited with code"));
        assert!(text.contains("--- stderr ---"));
        assert_ne!(result.metadata().exit_code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_shell_expansion() {
        let result = execute_command(
            &run("echo '*' ~"),
            &GuardPolicy::allow(["echo"]),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await;
        assert_eq!(result.text(), "* ~\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let result = execute_command(
            &run("sleep 5"),
            &GuardPolicy::allow(["sleep"]),
            Duration::from_millis(100),
        )
        .await;
        assert_eq!(result.error().unwrap().code, ToolError::TIMEOUT);
    }

    #[tokio::test]
    async fn test_injection_rejected() {
        let result = execute_command(
            &run("echo hi; rm -rf /"),
            &GuardPolicy::allow(["echo"]),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await;
        assert_eq!(result.error().unwrap().code, ToolError::VALIDATION_FAILED);
    }

    #[tokio::test]
    async fn test_empty_allow_list_denies() {
        let result = execute_command(&run("echo hi"), &GuardPolicy::unrestricted(), DEFAULT_COMMAND_TIMEOUT).await;
        assert_eq!(result.error().unwrap().code, ToolError::POLICY_DENIED);
    }

    #[tokio::test]
    async fn test_disabled() {
        let result = execute_command(&run("echo hi"), &GuardPolicy::disabled(), DEFAULT_COMMAND_TIMEOUT).await;
        assert_eq!(result.text(), "Command execution access is disabled");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = execute_command(
            &run("warden-no-such-program --version"),
            &GuardPolicy::allow(["warden-no-such-program"]),
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await;
        assert_eq!(result.error().unwrap().code, ToolError::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_read_capped_truncates() {
        let data = vec![b'a'; MAX_OUTPUT_SIZE + 10];
        let captured = read_capped(Some(&data[..])).await.unwrap();
        assert!(captured.truncated);
        assert_eq!(captured.bytes.len(), MAX_OUTPUT_SIZE);
        assert!(captured.text().ends_with(TRUNCATION_MARKER));
    }
}
