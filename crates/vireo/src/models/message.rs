use chrono::Utc;
use serde_json::{Map, Value};

use super::role::Role;
use crate::tool::ToolCallRequest;

/// A message to or from the model. Messages are appended to the
/// conversation in order and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    /// Text content. None when the message only carries tool calls.
    pub content: Option<String>,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// For tool-role messages, the id of the call this message answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub created: i64,
}

impl Message {
    fn new(role: Role) -> Self {
        Message {
            role,
            content: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            metadata: Map::new(),
            created: Utc::now().timestamp(),
        }
    }

    /// Create a new system message with the current timestamp
    pub fn system() -> Self {
        Message::new(Role::System)
    }

    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message::new(Role::User)
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Message::new(Role::Assistant)
    }

    /// Create a new tool-role message answering the given tool call id
    pub fn tool<S: Into<String>>(tool_call_id: S) -> Self {
        let mut message = Message::new(Role::Tool);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Set the text content of the message
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.content = Some(text.into());
        self
    }

    /// Attach tool call requests to the message
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Attach a metadata entry to the message
    pub fn with_metadata<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this message requests any tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content, or an empty string when absent
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let message = Message::user().with_text("hello");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.text(), "hello");
        assert!(!message.has_tool_calls());

        let message = Message::assistant()
            .with_tool_calls(vec![ToolCallRequest::new("1", "echo", "{}")]);
        assert!(message.content.is_none());
        assert!(message.has_tool_calls());

        let message = Message::tool("1").with_text("result");
        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_role_serialization() {
        let message = Message::tool("42").with_text("ok");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], json!("tool"));
        assert_eq!(value["tool_call_id"], json!("42"));
        // empty tool_calls and metadata are omitted from the wire shape
        assert!(value.get("tool_calls").is_none());
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_metadata() {
        let message = Message::user()
            .with_text("hi")
            .with_metadata("source", json!("test"));
        assert_eq!(message.metadata["source"], json!("test"));
    }
}
