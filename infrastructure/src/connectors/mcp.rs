//! rmcp-backed connector sessions
//!
//! | Transport | rmcp transport |
//! |-----------|----------------|
//! | `stdio` | [`TokioChildProcess`] (args, env, killed on drop) |
//! | `sse` | [`StreamableHttpClientTransport`] |
//! | `streamable-http` | [`StreamableHttpClientTransport`] |
//!
//! SSE endpoints are served through the streamable HTTP client, which
//! supersedes the standalone SSE transport.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, Content, RawContent, Tool as McpTool};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use warden_application::{ConnectorError, ConnectorFactory, ConnectorSession};
use warden_domain::{ConnectorConfig, ContentBlock, ToolDescriptor, ToolResult, TransportKind};

/// Default limit for a single remote tool call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Header name substrings (lowercase) treated as credentials
const SENSITIVE_HEADER_PATTERNS: &[&str] = &[
    "authorization",
    "cookie",
    "token",
    "secret",
    "key",
    "credential",
    "password",
    "auth",
];

pub fn is_sensitive_header(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_HEADER_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// Drop credential-like headers when the endpoint is plain `http://`.
///
/// Returns the names that were removed.
pub fn sanitize_headers_for_transport(
    url: &str,
    headers: &mut BTreeMap<String, String>,
) -> Vec<String> {
    if !url.to_ascii_lowercase().starts_with("http://") {
        return Vec::new();
    }
    let removed: Vec<String> = headers
        .keys()
        .filter(|k| is_sensitive_header(k))
        .cloned()
        .collect();
    for key in &removed {
        headers.remove(key);
    }
    if !removed.is_empty() {
        warn!(
            url = %url,
            removed_headers = ?removed,
            "Stripped credential headers from plain HTTP connector, use HTTPS to send them"
        );
    }
    removed
}

/// Opens rmcp client sessions for every transport kind
pub struct RmcpConnectorFactory {
    call_timeout: Duration,
}

impl RmcpConnectorFactory {
    pub fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn connect_stdio(
        &self,
        config: &ConnectorConfig,
    ) -> Result<RunningService<RoleClient, ()>, ConnectorError> {
        let command = config.command.as_deref().ok_or_else(|| {
            ConnectorError::InvalidConfig(format!("stdio connector '{}' has no command", config.id))
        })?;

        info!(
            connector = %config.id,
            command = %command,
            args = ?config.args,
            "Connecting to tool server (stdio)"
        );

        let transport = TokioChildProcess::new(Command::new(command).configure(|cmd| {
            cmd.args(&config.args);
            cmd.envs(&config.env);
            cmd.kill_on_drop(true);
        }))
        .map_err(|e| {
            ConnectorError::Connection(format!("failed to spawn '{}': {}", command, e))
        })?;

        ().serve(transport)
            .await
            .map_err(|e| ConnectorError::Connection(format!("handshake with '{}' failed: {}", config.id, e)))
    }

    async fn connect_http(
        &self,
        config: &ConnectorConfig,
    ) -> Result<RunningService<RoleClient, ()>, ConnectorError> {
        let url = config.url.as_deref().ok_or_else(|| {
            ConnectorError::InvalidConfig(format!("{} connector '{}' has no url", config.transport, config.id))
        })?;

        if url.starts_with("http://") {
            warn!(connector = %config.id, url = %url, "Connecting over plain HTTP");
        }
        info!(
            connector = %config.id,
            url = %url,
            transport = %config.transport,
            "Connecting to tool server (HTTP)"
        );

        let mut headers = config.headers.clone();
        sanitize_headers_for_transport(url, &mut headers);

        let mut header_map = HashMap::new();
        for (key, value) in &headers {
            let name = http::HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ConnectorError::InvalidConfig(format!("invalid header name: {}", key)))?;
            let value = http::HeaderValue::from_str(value)
                .map_err(|_| ConnectorError::InvalidConfig(format!("invalid header value for {}", key)))?;
            debug!(connector = %config.id, header = %key, "Setting header (value redacted)");
            header_map.insert(name, value);
        }

        let mut transport_config = StreamableHttpClientTransportConfig::with_uri(url);
        if !header_map.is_empty() {
            transport_config = transport_config.custom_headers(header_map);
        }

        let transport = StreamableHttpClientTransport::from_config(transport_config);
        ().serve(transport)
            .await
            .map_err(|e| ConnectorError::Connection(format!("handshake with '{}' failed: {}", config.id, e)))
    }
}

impl Default for RmcpConnectorFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectorFactory for RmcpConnectorFactory {
    async fn connect(
        &self,
        config: &ConnectorConfig,
    ) -> Result<Arc<dyn ConnectorSession>, ConnectorError> {
        let service = match config.transport {
            TransportKind::Stdio => self.connect_stdio(config).await?,
            TransportKind::Sse | TransportKind::StreamableHttp => self.connect_http(config).await?,
        };
        info!(connector = %config.id, "Connected to tool server");

        Ok(Arc::new(RmcpSession {
            connector_id: config.id.clone(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            call_timeout: self.call_timeout,
        }))
    }
}

/// One live rmcp client session
pub struct RmcpSession {
    connector_id: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
    call_timeout: Duration,
}

#[async_trait]
impl ConnectorSession for RmcpSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ConnectorError> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| ConnectorError::Protocol(format!("listing tools of '{}': {}", self.connector_id, e)))?;
        debug!(connector = %self.connector_id, count = tools.len(), "Discovered tools");
        Ok(tools.into_iter().map(tool_to_descriptor).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, ConnectorError> {
        let params = CallToolRequestParams {
            meta: None,
            name: Cow::Owned(name.to_string()),
            arguments: Some(arguments),
            task: None,
        };

        let result: CallToolResult = tokio::time::timeout(self.call_timeout, self.peer.call_tool(params))
            .await
            .map_err(|_| {
                ConnectorError::Timeout(format!(
                    "'{}' on '{}' after {:?}",
                    name, self.connector_id, self.call_timeout
                ))
            })?
            .map_err(|e| ConnectorError::Protocol(format!("calling '{}' on '{}': {}", name, self.connector_id, e)))?;

        Ok(call_result_to_tool_result(result))
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };
        info!(connector = %self.connector_id, "Closing tool server session");
        service
            .cancel()
            .await
            .map_err(|e| ConnectorError::Connection(format!("closing '{}': {}", self.connector_id, e)))?;
        Ok(())
    }
}

fn tool_to_descriptor(tool: McpTool) -> ToolDescriptor {
    let schema = serde_json::to_value(&*tool.input_schema)
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    ToolDescriptor::new(
        tool.name.to_string(),
        tool.description.as_deref().unwrap_or(""),
    )
    .with_schema(schema)
}

fn call_result_to_tool_result(result: CallToolResult) -> ToolResult {
    let mut blocks: Vec<ContentBlock> = result.content.iter().map(content_to_block).collect();

    if blocks.is_empty()
        && let Some(structured) = &result.structured_content
    {
        let text = serde_json::to_string_pretty(structured).unwrap_or_else(|_| structured.to_string());
        blocks.push(ContentBlock::text(text));
    }

    if result.is_error == Some(true) {
        ToolResult::remote_failure(blocks)
    } else {
        ToolResult::from_blocks(blocks)
    }
}

fn content_to_block(content: &Content) -> ContentBlock {
    match &content.raw {
        RawContent::Text(t) => ContentBlock::text(t.text.clone()),
        RawContent::Image(img) => ContentBlock::Image {
            mime_type: img.mime_type.clone(),
            size: img.data.len(),
        },
        RawContent::Resource(r) => {
            let resource = serde_json::to_value(&r.resource).unwrap_or(Value::Null);
            let field = |name: &str| resource.get(name).and_then(Value::as_str).map(str::to_string);
            ContentBlock::Resource {
                uri: field("uri").unwrap_or_default(),
                mime_type: field("mimeType"),
                text: field("text"),
            }
        }
        RawContent::Audio(a) => ContentBlock::binary_notice(format!(
            "[Audio content ({}, {} bytes) not displayed]",
            a.mime_type,
            a.data.len()
        )),
        _ => ContentBlock::binary_notice("[Unsupported content type not displayed]"),
    }
}
