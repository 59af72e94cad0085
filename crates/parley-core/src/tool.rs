use serde::{Deserialize, Serialize};

/// Metadata describing a tool a model may ask the host to call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    /// Tool name as advertised to the model.
    pub name: String,
    /// Human-readable description, used by the model to pick the tool.
    pub description: String,
    /// JSON Schema of the tool arguments.
    pub parameters_schema: serde_json::Value,
}

/// A request from the model to invoke a specific tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Identifier assigned by the provider for this call.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments to pass to the tool.
    pub arguments: serde_json::Value,
}
