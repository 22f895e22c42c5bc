//! Tool domain value objects: immutable result and error types
//!
//! Every invocation, local or remote, produces exactly one [`ToolResult`].
//! A result is either successful content or a single error block; the two
//! are never mixed. Failures carry a [`ToolError`] code so callers can tell
//! a policy denial from an I/O failure without parsing prose.

use serde::{Deserialize, Serialize};

/// Error that occurred during tool execution.
///
/// | Code | Meaning |
/// |------|---------|
/// | `POLICY_DENIED` | Capability disabled or allow-list rejection |
/// | `VALIDATION_FAILED` | Malformed URL, private target, bad quoting, metacharacters |
/// | `NOT_FOUND` | Unknown connector or missing resource |
/// | `NOT_CONNECTED` | Connector known but not connected |
/// | `UNKNOWN_TOOL` | Tool id does not resolve to any origin |
/// | `INVALID_ARGUMENT` | Missing or mistyped parameter |
/// | `EXECUTION_FAILED` | Underlying I/O, process or network error |
/// | `TIMEOUT` | Operation exceeded its deadline |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "POLICY_DENIED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ToolError {
    pub const POLICY_DENIED: &'static str = "POLICY_DENIED";
    pub const VALIDATION_FAILED: &'static str = "VALIDATION_FAILED";
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const NOT_CONNECTED: &'static str = "NOT_CONNECTED";
    pub const UNKNOWN_TOOL: &'static str = "UNKNOWN_TOOL";
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const EXECUTION_FAILED: &'static str = "EXECUTION_FAILED";
    pub const TIMEOUT: &'static str = "TIMEOUT";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn policy_denied(message: impl Into<String>) -> Self {
        Self::new(Self::POLICY_DENIED, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(Self::VALIDATION_FAILED, message)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            Self::NOT_FOUND,
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn not_connected(connector_id: impl Into<String>) -> Self {
        Self::new(
            Self::NOT_CONNECTED,
            format!("Connector is not connected: {}", connector_id.into()),
        )
    }

    pub fn unknown_tool(tool: impl Into<String>) -> Self {
        Self::new(Self::UNKNOWN_TOOL, format!("Unknown tool: {}", tool.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_ARGUMENT, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(Self::EXECUTION_FAILED, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(Self::TIMEOUT, message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

/// One block of tool output.
///
/// Local tools only ever produce `Text` and `BinaryNotice`. Remote tool
/// servers may also return images and embedded resources, which are kept
/// structurally so the rendering step can decide how to present them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text output
    Text { text: String },
    /// Stand-in for binary content that was deliberately not materialized
    BinaryNotice { text: String },
    /// Image returned by a remote tool (payload is not inlined downstream)
    Image {
        mime_type: String,
        /// Size of the encoded payload in bytes
        size: usize,
    },
    /// Embedded resource reference returned by a remote tool
    Resource {
        uri: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn binary_notice(text: impl Into<String>) -> Self {
        Self::BinaryNotice { text: text.into() }
    }

    /// Textual payload of the block, if it carries one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::BinaryNotice { text } => Some(text),
            Self::Resource { text, .. } => text.as_deref(),
            Self::Image { .. } => None,
        }
    }
}

/// Structured metadata about tool execution.
///
/// | Tool | `duration_ms` | `bytes` | `truncated` | `exit_code` | `status` | `final_url` |
/// |------|:---:|:---:|:---:|:---:|:---:|:---:|
/// | `read_file` | yes | yes | - | - | - | - |
/// | `list_directory` | yes | - | - | - | - | - |
/// | `fetch_url` | yes | yes | yes | - | yes | yes |
/// | `execute_command` | yes | yes | yes | yes | - | - |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Duration of execution in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Number of bytes processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Oversized content was capped (non-fatal)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    /// For command execution: exit code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// For fetches: HTTP status of the final hop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// For fetches: URL after following redirects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
}

/// Result of a tool invocation.
///
/// Fields are private: a result is built once through [`success`](Self::success),
/// [`from_blocks`](Self::from_blocks) or [`failure`](Self::failure) and then
/// only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    content: Vec<ContentBlock>,
    is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ToolError>,
    #[serde(default)]
    metadata: ToolResultMetadata,
}

impl ToolResult {
    /// Create a successful result with a single text block
    pub fn success(output: impl Into<String>) -> Self {
        Self::from_blocks(vec![ContentBlock::text(output)])
    }

    /// Create a successful result from arbitrary content blocks
    pub fn from_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: false,
            error: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Create a failed result carrying a single error block
    pub fn failure(error: ToolError) -> Self {
        Self {
            content: vec![ContentBlock::text(error.message.clone())],
            is_error: true,
            error: Some(error),
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Error result reported by a remote tool server.
    ///
    /// The server's own blocks are preserved; the code is always
    /// `EXECUTION_FAILED` since the server gives no finer classification.
    pub fn remote_failure(content: Vec<ContentBlock>) -> Self {
        let message = content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            content,
            is_error: true,
            error: Some(ToolError::execution_failed(message)),
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Attach metadata (builder style, used only while constructing)
    pub fn with_metadata(mut self, metadata: ToolResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn is_success(&self) -> bool {
        !self.is_error
    }

    pub fn content(&self) -> &[ContentBlock] {
        &self.content
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn metadata(&self) -> &ToolResultMetadata {
        &self.metadata
    }

    /// All textual payloads joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::not_found("/path/to/file");
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.to_string(), "[NOT_FOUND] Resource not found: /path/to/file");
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("file contents");

        assert!(result.is_success());
        assert_eq!(result.text(), "file contents");
        assert!(result.error().is_none());
    }

    #[test]
    fn test_tool_result_failure_has_single_error_block() {
        let result = ToolResult::failure(ToolError::policy_denied("Filesystem access is disabled"));

        assert!(result.is_error());
        assert_eq!(result.content().len(), 1);
        assert_eq!(result.error().unwrap().code, ToolError::POLICY_DENIED);
        assert_eq!(result.text(), "Filesystem access is disabled");
    }

    #[test]
    fn test_remote_failure_keeps_blocks() {
        let result = ToolResult::remote_failure(vec![
            ContentBlock::text("boom"),
            ContentBlock::Image {
                mime_type: "image/png".into(),
                size: 10,
            },
        ]);

        assert!(result.is_error());
        assert_eq!(result.content().len(), 2);
        assert_eq!(result.error().unwrap().message, "boom");
    }

    #[test]
    fn test_content_block_serializes_with_kind_tag() {
        let json = serde_json::to_value(ContentBlock::binary_notice("skipped")).unwrap();
        assert_eq!(json["kind"], "binary_notice");
        assert_eq!(json["text"], "skipped");
    }

    #[test]
    fn test_truncated_flag_omitted_when_false() {
        let json = serde_json::to_value(ToolResultMetadata::default()).unwrap();
        assert!(json.get("truncated").is_none());
    }
}
