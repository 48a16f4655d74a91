//! Tool registry - manages available tools for the agent

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::agent::types::ToolDefinition;
use crate::error::Result;

use super::traits::{Tool, ToolCall, ToolResult};

/// Registry of available tools, ordered by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call. Unknown tools and schema violations come back
    /// as failed results; only the tool itself can return `Err`.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let Some(tool) = self.get(&call.name) else {
            return Ok(ToolResult::failure(format!("Unknown tool: {}", call.name)));
        };

        if let Err(problem) = validate_arguments(&tool.parameters_schema(), &call.arguments) {
            return Ok(ToolResult::failure(format!(
                "Invalid arguments for {}: {}",
                call.name, problem
            )));
        }

        tool.execute(call.arguments.clone()).await
    }

    /// Get tool count
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// List tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Name and description of every tool
    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }
}

/// Check `args` against an object schema: required keys, primitive types,
/// and string arrays. Unknown keys are ignored; `null` counts as absent.
pub fn validate_arguments(schema: &Value, args: &Value) -> std::result::Result<(), String> {
    let Some(obj) = args.as_object() else {
        return Err("arguments must be a JSON object".to_string());
    };

    let present = |key: &str| obj.get(key).is_some_and(|v| !v.is_null());

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !present(key) {
                return Err(format!("missing required field '{}'", key));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, prop) in properties {
        let Some(value) = obj.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        let Some(expected) = prop.get("type").and_then(Value::as_str) else {
            continue;
        };
        if !type_matches(expected, value) {
            return Err(format!("field '{}' must be {}", key, article(expected)));
        }
        if expected == "array" {
            if let Some(item_type) = prop.pointer("/items/type").and_then(Value::as_str) {
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                if items.iter().any(|item| !type_matches(item_type, item)) {
                    return Err(format!("field '{}' must contain only {} values", key, item_type));
                }
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn article(type_name: &str) -> String {
    match type_name {
        "integer" | "array" | "object" => format!("an {}", type_name),
        _ => format!("a {}", type_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text back"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string"},
                    "times": {"type": "integer"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value) -> Result<ToolResult> {
            Ok(ToolResult::success(args["text"].as_str().unwrap_or_default()))
        }
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "c1".to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_execute_known_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.names(), vec!["echo"]);

        let result = registry.execute(&call("echo", json!({"text": "hi"}))).await.unwrap();
        assert_eq!(result.to_string(), "hi");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure() {
        let registry = ToolRegistry::new();
        let result = registry.execute(&call("nope", json!({}))).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.to_string(), "Error: Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_schema_violation_is_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let missing = registry.execute(&call("echo", json!({}))).await.unwrap();
        assert!(missing.to_string().contains("missing required field 'text'"));

        let wrong = registry
            .execute(&call("echo", json!({"text": "hi", "times": "twice"})))
            .await
            .unwrap();
        assert!(wrong.to_string().contains("'times' must be an integer"));
    }

    #[test]
    fn test_validate_arrays_and_nulls() {
        let schema = EchoTool.parameters_schema();
        assert!(validate_arguments(&schema, &json!({"text": "a", "tags": ["x", "y"]})).is_ok());
        assert!(validate_arguments(&schema, &json!({"text": "a", "tags": ["x", 1]})).is_err());
        assert!(validate_arguments(&schema, &json!({"text": "a", "times": null})).is_ok());
        assert!(validate_arguments(&schema, &json!({"text": null})).is_err());
        assert!(validate_arguments(&schema, &json!(["text"])).is_err());
    }
}
