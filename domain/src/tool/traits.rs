//! Tool domain traits
//!
//! Contains pure domain logic traits for tool validation.
//! The async executor port is defined in the application layer.

use super::entities::{ToolCall, ToolDescriptor};

/// Validator for tool calls
///
/// Validates a call against its descriptor without any I/O.
pub trait ToolValidator {
    fn validate(&self, call: &ToolCall, descriptor: &ToolDescriptor) -> Result<(), String>;
}

/// Checks required parameters and rejects parameters the schema does not declare
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, descriptor: &ToolDescriptor) -> Result<(), String> {
        for name in descriptor.required_parameters() {
            if !call.arguments.contains_key(name) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    name, descriptor.name
                ));
            }
        }

        if let Some(props) = descriptor
            .parameter_schema
            .get("properties")
            .and_then(|p| p.as_object())
        {
            for arg_name in call.arguments.keys() {
                if !props.contains_key(arg_name) {
                    return Err(format!(
                        "Unknown parameter '{}' for tool '{}'",
                        arg_name, descriptor.name
                    ));
                }
            }
        }

        Ok(())
    }
}
