use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AgentResult;

/// A capability the model can invoke by name. Implementations are
/// registered at agent construction and shared read-only across runs.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identifier the model uses to request this tool
    fn name(&self) -> &str;

    /// A description of what the tool does
    fn description(&self) -> &str;

    /// JSON schema describing the accepted input
    fn parameters(&self) -> Value;

    /// Execute the tool with input already validated against `parameters`
    async fn call(&self, arguments: Value) -> AgentResult<Value>;
}

/// The model-facing descriptor of a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// Parameters that the tool accepts
    pub parameters: Value,
}

impl ToolSpec {
    /// Create a new spec with the given name and description
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolSpec {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Derive the descriptor from a registered tool
    pub fn from_tool(tool: &dyn Tool) -> Self {
        ToolSpec {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        }
    }
}

/// A single model-requested invocation of a named tool. The argument
/// payload stays raw text until the executor parses it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Unique id of this call within the run
    pub id: String,
    /// The name of the tool to execute
    pub name: String,
    /// Raw argument payload, parsing deferred to the executor
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// The outcome of one tool call. Exactly one result is produced per
/// request, whether the call succeeded or failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success<S: Into<String>>(tool_call_id: S, data: Value) -> Self {
        ToolResult {
            tool_call_id: tool_call_id.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure<S: Into<String>, E: Into<String>>(tool_call_id: S, error: E) -> Self {
        ToolResult {
            tool_call_id: tool_call_id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Render the result as text for the conversation, so the model can
    /// read successes and retry after failures alike.
    pub fn content_for_model(&self) -> String {
        if let Some(error) = &self.error {
            format!("Error: {}", error)
        } else if let Some(data) = &self.data {
            data.to_string()
        } else {
            "null".to_string()
        }
    }
}

/// Shape-check a value against a JSON schema object. Covers the type
/// keyword, required properties, and nested property schemas; unknown
/// keywords are ignored.
pub fn validate_against_schema(schema: &Value, value: &Value) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            return Err(format!(
                "expected {}, got {}",
                expected,
                type_name(value)
            ));
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if value.get(name).is_none() {
                return Err(format!("missing required property: {}", name));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, property_schema) in properties {
            if let Some(property) = value.get(name) {
                validate_against_schema(property_schema, property)
                    .map_err(|detail| format!("{}: {}", name, detail))?;
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes back the input"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            })
        }

        async fn call(&self, arguments: Value) -> AgentResult<Value> {
            Ok(json!({"echo": arguments["message"]}))
        }
    }

    #[test]
    fn test_spec_from_tool() {
        let spec = ToolSpec::from_tool(&EchoTool);
        assert_eq!(spec.name, "echo");
        assert_eq!(spec.description, "Echoes back the input");
        assert_eq!(spec.parameters["required"], json!(["message"]));
    }

    #[test]
    fn test_result_content_for_model() {
        let ok = ToolResult::success("1", json!({"temperature": 20}));
        assert_eq!(ok.content_for_model(), r#"{"temperature":20}"#);

        let failed = ToolResult::failure("1", "boom");
        assert_eq!(failed.content_for_model(), "Error: boom");
    }

    #[test]
    fn test_validate_required() {
        let schema = json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        });
        assert!(validate_against_schema(&schema, &json!({"city": "Tokyo"})).is_ok());

        let err = validate_against_schema(&schema, &json!({})).unwrap_err();
        assert!(err.contains("missing required property: city"));
    }

    #[test]
    fn test_validate_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "count": {"type": "integer"},
                "tags": {"type": "array"}
            }
        });
        assert!(validate_against_schema(&schema, &json!({"count": 3, "tags": []})).is_ok());

        let err = validate_against_schema(&schema, &json!({"count": "three"})).unwrap_err();
        assert!(err.contains("count"));
        assert!(err.contains("expected integer"));

        let err = validate_against_schema(&schema, &json!("not an object")).unwrap_err();
        assert!(err.contains("expected object"));
    }

    #[test]
    fn test_validate_ignores_schemaless() {
        // A non-object schema never rejects
        assert!(validate_against_schema(&json!(true), &json!({"anything": 1})).is_ok());
    }
}
