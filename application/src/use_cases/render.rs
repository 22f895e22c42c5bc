//! Textual projections of a [`ToolResult`]
//!
//! Rendering borrows the result and never modifies it; the canonical
//! result is still handed back to the caller alongside any rendering.

use serde::{Deserialize, Serialize};
use warden_domain::{ContentBlock, ToolResult};

/// Output format requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderTarget {
    /// Flat text suitable for a model-facing tool message
    #[default]
    Text,
    /// The canonical result serialized as pretty JSON
    Json,
}

impl std::str::FromStr for RenderTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(RenderTarget::Text),
            "json" => Ok(RenderTarget::Json),
            other => Err(format!("unknown render target: {}", other)),
        }
    }
}

pub fn render(result: &ToolResult, target: RenderTarget) -> String {
    match target {
        RenderTarget::Text => render_text(result),
        RenderTarget::Json => serde_json::to_string_pretty(result)
            .unwrap_or_else(|e| format!("Error: failed to serialize result: {}", e)),
    }
}

/// Flatten a result into a single string.
///
/// Error results become `Error: <message>`. Otherwise text blocks are
/// concatenated with newlines, resources become `[Resource: uri (mime)]`
/// and images become `[Image: mime, N bytes]`.
pub fn render_text(result: &ToolResult) -> String {
    if result.is_error() {
        let message = result
            .error()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| result.text());
        return format!("Error: {}", message);
    }

    result
        .content()
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Text { text } | ContentBlock::BinaryNotice { text } => text.clone(),
        ContentBlock::Image { mime_type, size } => {
            format!("[Image: {}, {} bytes]", mime_type, size)
        }
        ContentBlock::Resource {
            uri,
            mime_type,
            text,
        } => {
            let tag = match mime_type {
                Some(mime) => format!("[Resource: {} ({})]", uri, mime),
                None => format!("[Resource: {}]", uri),
            };
            match text {
                Some(body) if !body.is_empty() => format!("{}\n{}", tag, body),
                _ => tag,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_domain::ToolError;

    #[test]
    fn test_error_rendering() {
        let result = ToolResult::failure(ToolError::policy_denied("Network access is disabled"));
        assert_eq!(render_text(&result), "Error: Network access is disabled");
    }

    #[test]
    fn test_mixed_blocks() {
        let result = ToolResult::from_blocks(vec![
            ContentBlock::text("first"),
            ContentBlock::Resource {
                uri: "file:///notes.md".into(),
                mime_type: Some("text/markdown".into()),
                text: None,
            },
            ContentBlock::Image {
                mime_type: "image/png".into(),
                size: 2048,
            },
            ContentBlock::text("last"),
        ]);

        assert_eq!(
            render_text(&result),
            "first\n[Resource: file:///notes.md (text/markdown)]\n[Image: image/png, 2048 bytes]\nlast"
        );
    }

    #[test]
    fn test_resource_with_inline_text() {
        let result = ToolResult::from_blocks(vec![ContentBlock::Resource {
            uri: "mem://a".into(),
            mime_type: None,
            text: Some("body".into()),
        }]);
        assert_eq!(render_text(&result), "[Resource: mem://a]\nbody");
    }

    #[test]
    fn test_render_does_not_mutate() {
        let result = ToolResult::success("hello");
        let before = result.clone();
        let _ = render(&result, RenderTarget::Text);
        let _ = render(&result, RenderTarget::Json);
        assert_eq!(result, before);
    }

    #[test]
    fn test_json_target_is_canonical() {
        let result = ToolResult::success("hello");
        let json: serde_json::Value =
            serde_json::from_str(&render(&result, RenderTarget::Json)).unwrap();
        assert_eq!(json["is_error"], false);
        assert_eq!(json["content"][0]["text"], "hello");
    }

    #[test]
    fn test_target_parse() {
        assert_eq!("JSON".parse::<RenderTarget>().unwrap(), RenderTarget::Json);
        assert!("yaml".parse::<RenderTarget>().is_err());
    }
}
