//! Filesystem tools: read_file, list_directory

use std::io::ErrorKind;
use std::time::Instant;

use tracing::debug;
use warden_domain::{
    ContentBlock, GuardPolicy, ToolCall, ToolDescriptor, ToolError, ToolResult,
    ToolResultMetadata,
};

use crate::guard::PathGuard;

/// Tool name constants
pub const READ_FILE: &str = "read_file";
pub const LIST_DIRECTORY: &str = "list_directory";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

pub fn read_file_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(READ_FILE, "Read the full text contents of a file")
        .with_parameter("path", "string", "Path to the file to read", true)
}

pub fn list_directory_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        LIST_DIRECTORY,
        "List the entries of a directory, one per line, tagged [DIR] or [FILE]",
    )
    .with_parameter("path", "string", "Path to the directory to list", true)
}

/// Execute the read_file tool
pub async fn execute_read_file(call: &ToolCall, policy: &GuardPolicy) -> ToolResult {
    let start = Instant::now();

    let path_str = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(ToolError::invalid_argument(e)),
    };

    let path = match PathGuard::check(path_str, policy) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(e.into()),
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return ToolResult::failure(ToolError::not_found(path_str));
        }
        Err(e) => {
            return ToolResult::failure(ToolError::execution_failed(format!(
                "Failed to get file metadata: {}",
                e
            )));
        }
    };

    if metadata.is_dir() {
        return ToolResult::failure(ToolError::invalid_argument(format!(
            "'{}' is a directory, use {} instead",
            path_str, LIST_DIRECTORY
        )));
    }

    if metadata.len() > MAX_READ_SIZE {
        return ToolResult::failure(ToolError::invalid_argument(format!(
            "File too large ({} bytes). Maximum size is {} bytes",
            metadata.len(),
            MAX_READ_SIZE
        )));
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) => {
            return ToolResult::failure(ToolError::execution_failed(format!(
                "Failed to read file: {}",
                e
            )));
        }
    };

    let size = bytes.len();
    let block = match String::from_utf8(bytes) {
        Ok(text) => ContentBlock::text(text),
        Err(_) => ContentBlock::binary_notice(format!(
            "[Binary file not displayed: {} ({} bytes)]",
            path_str, size
        )),
    };

    debug!(path = %path.display(), bytes = size, "Read file");
    ToolResult::from_blocks(vec![block]).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(size),
        ..Default::default()
    })
}

/// Execute the list_directory tool
pub async fn execute_list_directory(call: &ToolCall, policy: &GuardPolicy) -> ToolResult {
    let start = Instant::now();

    let path_str = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(ToolError::invalid_argument(e)),
    };

    let path = match PathGuard::check(path_str, policy) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(e.into()),
    };

    let mut reader = match tokio::fs::read_dir(&path).await {
        Ok(r) => r,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return ToolResult::failure(ToolError::not_found(path_str));
        }
        Err(e) => {
            return ToolResult::failure(ToolError::execution_failed(format!(
                "Failed to list directory: {}",
                e
            )));
        }
    };

    let mut entries: Vec<(String, bool)> = Vec::new();
    loop {
        let entry = match reader.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                return ToolResult::failure(ToolError::execution_failed(format!(
                    "Failed to read directory entry: {}",
                    e
                )));
            }
        };
        // Follow symlinks so a link to a directory lists as [DIR]
        let is_dir = match tokio::fs::metadata(entry.path()).await {
            Ok(m) => m.is_dir(),
            Err(_) => entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false),
        };
        entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    entries.sort();

    let output = if entries.is_empty() {
        "(empty directory)".to_string()
    } else {
        entries
            .iter()
            .map(|(name, is_dir)| {
                let tag = if *is_dir { "[DIR]" } else { "[FILE]" };
                format!("{} {}", tag, name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    debug!(path = %path.display(), entries = entries.len(), "Listed directory");
    ToolResult::success(output).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        ..Default::default()
    })
}
