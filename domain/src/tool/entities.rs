//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Description of a tool, either declared statically by the sandbox or
/// discovered from a live connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within its origin (e.g., "read_file")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema describing the accepted parameters
    pub parameter_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    /// Replace the parameter schema wholesale (used for discovered tools)
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.parameter_schema = schema;
        self
    }

    /// Add a single parameter to an object schema
    pub fn with_parameter(
        mut self,
        name: &str,
        param_type: &str,
        description: &str,
        required: bool,
    ) -> Self {
        if let Some(schema) = self.parameter_schema.as_object_mut() {
            if let Some(Value::Object(props)) = schema.get_mut("properties") {
                props.insert(
                    name.to_string(),
                    json!({ "type": param_type, "description": description }),
                );
            }
            if required {
                let entry = schema
                    .entry("required")
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(list) = entry {
                    list.push(Value::String(name.to_string()));
                }
            }
        }
        self
    }

    /// Names of parameters marked as required in the schema
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameter_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call (un-namespaced)
    pub tool_name: String,
    /// Arguments passed to the tool
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
        }
    }

    /// Build a call from an already-decoded argument object
    pub fn with_arguments(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }
}
