use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::providers::base::{Provider, ProviderResponse};
use crate::tool::ToolSpec;

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<ProviderResponse>>>,
    calls: Arc<AtomicUsize>,
    failure: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(AtomicUsize::new(0)),
            failure: None,
        }
    }

    /// Create a mock provider whose every call fails with an adapter error
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            failure: Some(message.into()),
        }
    }

    /// Number of completions requested so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[ToolSpec],
        _temperature: f32,
    ) -> AgentResult<ProviderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(AgentError::AdapterError(message.clone()));
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok(ProviderResponse::text(""))
        } else {
            Ok(responses.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let provider = MockProvider::new(vec![
            ProviderResponse::text("first"),
            ProviderResponse::text("second"),
        ]);

        let first = provider.complete("", &[], &[], 0.7).await.unwrap();
        assert_eq!(first.content.as_deref(), Some("first"));

        let second = provider.complete("", &[], &[], 0.7).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("second"));

        // Exhausted scripts fall back to an empty response
        let third = provider.complete("", &[], &[], 0.7).await.unwrap();
        assert_eq!(third.content.as_deref(), Some(""));

        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = MockProvider::failing("connection refused");
        let err = provider.complete("", &[], &[], 0.7).await.unwrap_err();
        assert!(matches!(err, AgentError::AdapterError(_)));
        assert_eq!(provider.call_count(), 1);
    }
}
