//! Tool (function) selection: the model picks one of several declared
//! signatures and supplies its arguments.

use crate::schema::Schema;
use crate::ExtractError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A callable the model may choose. Its parameters are described by a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSignature {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Schema,
}

impl ToolSignature {
    /// Uses the schema's name and description for the tool.
    pub fn from_schema(parameters: Schema) -> Self {
        Self {
            name: parameters.name.clone(),
            description: parameters.description.clone(),
            parameters,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub system: String,
    pub instruction: String,
    pub tools: Vec<ToolSignature>,
}

impl ToolRequest {
    /// Accepts `call` only if it names a declared tool and its arguments
    /// satisfy that tool's parameter schema.
    pub fn validate_call(&self, call: ToolCall) -> Result<ToolCall, ExtractError> {
        let signature = self
            .tools
            .iter()
            .find(|tool| tool.name == call.name)
            .ok_or_else(|| ExtractError::UnknownTool(call.name.clone()))?;

        signature.parameters.validate(&call.arguments)?;
        Ok(call)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Reads a string argument that validation has already guaranteed.
    pub fn str_arg(&self, key: &str) -> Result<String, ExtractError> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ExtractError::ParseError(format!("{}: missing argument '{}'", self.name, key))
            })
    }
}

/// A closed set of tools mapped onto a Rust enum.
pub trait ToolSet: Sized {
    fn signatures() -> Vec<ToolSignature>;
    fn from_call(call: ToolCall) -> Result<Self, ExtractError>;
}
