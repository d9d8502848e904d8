use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::tool::{ToolCallRequest, ToolSpec};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Accumulate another round's usage into this one
    pub fn add(&mut self, other: &Usage) {
        fn merge(a: &mut Option<i32>, b: Option<i32>) {
            if let Some(b) = b {
                *a = Some(a.unwrap_or(0) + b);
            }
        }
        merge(&mut self.input_tokens, other.input_tokens);
        merge(&mut self.output_tokens, other.output_tokens);
        merge(&mut self.total_tokens, other.total_tokens);
    }
}

/// One complete model response: final content, requested tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default)]
    pub usage: Usage,
}

impl ProviderResponse {
    /// A plain text response with no tool calls
    pub fn text<S: Into<String>>(content: S) -> Self {
        ProviderResponse {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// A response requesting the given tool calls
    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        ProviderResponse {
            tool_calls,
            ..Default::default()
        }
    }

    /// Retain any content alongside the tool calls
    pub fn with_content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// Incremental units yielded by a provider's streaming interface. The
/// concatenation of `ToolCallArgs` fragments for one id equals the raw
/// argument payload of the matching request in the final response.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEvent {
    Content { delta: String },
    ToolCallStart { id: String, name: String },
    ToolCallArgs { id: String, fragment: String },
    ToolCallEnd { id: String },
    Done(ProviderResponse),
}

/// Base trait for model capabilities (OpenAI, Anthropic, etc). The loop
/// depends only on this contract, never on a concrete provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next response for the conversation
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        temperature: f32,
    ) -> AgentResult<ProviderResponse>;

    /// Incremental variant of `complete`. The default adaptor performs a
    /// single-shot call and replays it as one delta per unit, so
    /// providers without native streaming still satisfy the contract.
    /// The stream always ends with `CompletionEvent::Done`.
    async fn complete_stream(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
        temperature: f32,
    ) -> AgentResult<BoxStream<'static, AgentResult<CompletionEvent>>> {
        let response = self.complete(system, messages, tools, temperature).await?;

        let mut events = Vec::new();
        if let Some(content) = &response.content {
            if !content.is_empty() {
                events.push(CompletionEvent::Content {
                    delta: content.clone(),
                });
            }
        }
        for call in &response.tool_calls {
            events.push(CompletionEvent::ToolCallStart {
                id: call.id.clone(),
                name: call.name.clone(),
            });
            if !call.arguments.is_empty() {
                events.push(CompletionEvent::ToolCallArgs {
                    id: call.id.clone(),
                    fragment: call.arguments.clone(),
                });
            }
            events.push(CompletionEvent::ToolCallEnd {
                id: call.id.clone(),
            });
        }
        events.push(CompletionEvent::Done(response));

        Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_accumulation() {
        let mut usage = Usage::new(Some(10), Some(20), Some(30));
        usage.add(&Usage::new(Some(1), None, Some(1)));
        assert_eq!(usage.input_tokens, Some(11));
        assert_eq!(usage.output_tokens, Some(20));
        assert_eq!(usage.total_tokens, Some(31));

        let mut empty = Usage::default();
        empty.add(&Usage::new(Some(5), Some(5), Some(10)));
        assert_eq!(empty.total_tokens, Some(10));
    }

    #[test]
    fn test_usage_serialization() {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let value = serde_json::to_value(&usage).unwrap();
        assert_eq!(value["input_tokens"], json!(10));
        assert_eq!(value["output_tokens"], json!(20));
        assert_eq!(value["total_tokens"], json!(30));
    }

    struct SingleShot;

    #[async_trait]
    impl Provider for SingleShot {
        async fn complete(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolSpec],
            _temperature: f32,
        ) -> AgentResult<ProviderResponse> {
            Ok(ProviderResponse::tool_calls(vec![ToolCallRequest::new(
                "1",
                "echo",
                r#"{"message":"hi"}"#,
            )])
            .with_content("calling echo"))
        }
    }

    #[tokio::test]
    async fn test_default_stream_adaptor_ordering() {
        let mut stream = SingleShot
            .complete_stream("", &[], &[], 0.7)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }

        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], CompletionEvent::Content { delta } if delta == "calling echo"));
        assert!(matches!(&events[1], CompletionEvent::ToolCallStart { id, name } if id == "1" && name == "echo"));
        assert!(
            matches!(&events[2], CompletionEvent::ToolCallArgs { id, fragment } if id == "1" && fragment == r#"{"message":"hi"}"#)
        );
        assert!(matches!(&events[3], CompletionEvent::ToolCallEnd { id } if id == "1"));
        assert!(matches!(&events[4], CompletionEvent::Done(_)));
    }
}
