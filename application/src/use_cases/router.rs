//! Tool Router: one entry point for local and remote tools
//!
//! ```text
//!                      ┌──────────────┐
//!  "read_file"  ──────▶│              │──▶ LocalSandbox (ToolExecutorPort)
//!  "local:read_file" ─▶│  ToolRouter  │
//!  "remote:gh:search" ▶│              │──▶ ConnectionManager::call
//!                      └──────────────┘
//! ```
//!
//! Every failure below the router comes back as an error-flagged
//! [`ToolResult`]. The one exception is an invocation whose params are not
//! a JSON object, which is a caller bug and surfaces as [`InvocationError`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use warden_domain::{
    DefaultToolValidator, NamespacedToolId, PolicyBundle, ToolCall, ToolError, ToolOrigin,
    ToolResult, ToolValidator,
};

use super::connection_manager::{CatalogEntry, ConnectionManager};
use super::render::{RenderTarget, render};
use crate::ports::tool_executor::ToolExecutorPort;

/// Malformed invocation shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("tool params must be a JSON object, got {0}")]
    ParamsNotObject(&'static str),
}

/// A single tool invocation as received from the conversational runtime
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// `local:<name>`, `remote:<connector>:<name>` or a bare sandbox tool name
    pub tool: String,
    pub params: Value,
    pub policy: PolicyBundle,
    pub render: Option<RenderTarget>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, params: Value, policy: PolicyBundle) -> Self {
        Self {
            tool: tool.into(),
            params,
            policy,
            render: None,
        }
    }

    pub fn rendered_as(mut self, target: RenderTarget) -> Self {
        self.render = Some(target);
        self
    }
}

/// Canonical result plus its optional rendering
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub result: ToolResult,
    pub rendered: Option<String>,
}

pub struct ToolRouter {
    sandbox: Arc<dyn ToolExecutorPort>,
    connectors: Arc<ConnectionManager>,
    validator: DefaultToolValidator,
}

impl ToolRouter {
    pub fn new(sandbox: Arc<dyn ToolExecutorPort>, connectors: Arc<ConnectionManager>) -> Self {
        Self {
            sandbox,
            connectors,
            validator: DefaultToolValidator,
        }
    }

    pub fn connectors(&self) -> &Arc<ConnectionManager> {
        &self.connectors
    }

    /// Resolve a raw tool name to its namespaced id.
    ///
    /// Bare names and `local:` ids must name a sandbox tool. Remote ids are
    /// resolved syntactically; whether the connector exists is decided at
    /// call time.
    pub fn resolve(&self, raw: &str) -> Result<NamespacedToolId, ToolError> {
        let id = if raw.contains(':') {
            NamespacedToolId::parse(raw)
                .map_err(|e| ToolError::new(ToolError::UNKNOWN_TOOL, e.to_string()))?
        } else {
            NamespacedToolId::local(raw)
        };

        if id.is_local() && !self.sandbox.has_tool(&id.name) {
            return Err(ToolError::unknown_tool(raw));
        }
        Ok(id)
    }

    /// Aggregated catalog: sandbox tools first, then every connected
    /// connector's tools
    pub async fn list_capabilities(&self) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> = self
            .sandbox
            .tools()
            .iter()
            .map(|tool| CatalogEntry {
                id: NamespacedToolId::local(&tool.name),
                descriptor: tool.clone(),
            })
            .collect();
        entries.extend(self.connectors.list_capabilities().await);
        entries
    }

    pub async fn dispatch(
        &self,
        invocation: ToolInvocation,
    ) -> Result<DispatchOutcome, InvocationError> {
        let arguments = match invocation.params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(InvocationError::ParamsNotObject(json_kind(&other))),
        };

        let start = Instant::now();
        let result = match self.resolve(&invocation.tool) {
            Ok(id) => self.route(id, arguments, &invocation.policy).await,
            Err(e) => {
                warn!(tool = %invocation.tool, "Unresolvable tool id");
                ToolResult::failure(e)
            }
        };

        info!(
            tool = %invocation.tool,
            is_error = result.is_error(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Dispatched tool call"
        );

        let rendered = invocation.render.map(|target| render(&result, target));
        Ok(DispatchOutcome { result, rendered })
    }

    async fn route(
        &self,
        id: NamespacedToolId,
        arguments: Map<String, Value>,
        policy: &PolicyBundle,
    ) -> ToolResult {
        match id.origin {
            ToolOrigin::Local => {
                let call = ToolCall::with_arguments(&id.name, arguments);
                if let Some(descriptor) = self.sandbox.get_tool(&id.name)
                    && let Err(message) = self.validator.validate(&call, descriptor)
                {
                    return ToolResult::failure(ToolError::invalid_argument(message));
                }
                debug!(tool = %id.name, "Routing to local sandbox");
                self.sandbox.execute(&call, policy).await
            }
            ToolOrigin::Remote(connector_id) => {
                debug!(connector = %connector_id, tool = %id.name, "Routing to connector");
                match self.connectors.call(&connector_id, &id.name, arguments).await {
                    Ok(result) => result,
                    Err(e) => ToolResult::failure(e.to_tool_error()),
                }
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
