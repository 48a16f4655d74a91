//! Core tool trait and result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::types::{AssistantToolCall, FunctionDefinition, ToolDefinition};
use crate::error::{Error, Result};

/// A tool that can be called by the LLM
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON Schema for tool parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with arguments already checked against the schema
    async fn execute(&self, args: Value) -> Result<ToolResult>;

    /// Convert to a chat-completion tool definition
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Result content (for successful execution)
    pub content: Option<String>,
    /// Error message (for failed execution)
    pub error: Option<String>,
    /// Structured payload alongside the text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: Some(content.into()),
            error: None,
            metadata: None,
        }
    }

    /// Create a successful result with metadata
    pub fn success_with_metadata(content: impl Into<String>, metadata: Value) -> Self {
        ToolResult {
            success: true,
            content: Some(content.into()),
            error: None,
            metadata: Some(metadata),
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            content: None,
            error: Some(error.into()),
            metadata: None,
        }
    }
}

impl std::fmt::Display for ToolResult {
    /// Text handed back to the model
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.success {
            f.write_str(self.content.as_deref().unwrap_or_default())
        } else {
            write!(f, "Error: {}", self.error.as_deref().unwrap_or_default())
        }
    }
}

/// A tool call request from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments as JSON
    pub arguments: Value,
}

impl ToolCall {
    /// Decode the model's JSON-encoded arguments. An empty string means no
    /// arguments.
    pub fn from_assistant(call: &AssistantToolCall) -> Result<Self> {
        let raw = call.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw).map_err(|e| {
                Error::InvalidInput(format!(
                    "Malformed arguments for {}: {}",
                    call.function.name, e
                ))
            })?
        };

        Ok(ToolCall {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_display() {
        let success = ToolResult::success("Done!");
        assert!(success.success);
        assert_eq!(success.to_string(), "Done!");

        let failure = ToolResult::failure("Oops!");
        assert!(!failure.success);
        assert_eq!(failure.to_string(), "Error: Oops!");
    }

    #[test]
    fn test_from_assistant() {
        let call = AssistantToolCall::new("c1", "search", r#"{"query": "rust"}"#);
        let parsed = ToolCall::from_assistant(&call).unwrap();
        assert_eq!(parsed.arguments["query"], "rust");

        let empty = AssistantToolCall::new("c2", "search", "");
        assert!(ToolCall::from_assistant(&empty).unwrap().arguments.is_object());

        let broken = AssistantToolCall::new("c3", "search", "{query: ");
        assert!(matches!(ToolCall::from_assistant(&broken), Err(Error::InvalidInput(_))));
    }
}
