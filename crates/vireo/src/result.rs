use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AgentError;
use crate::providers::base::Usage;
use crate::tool::{validate_against_schema, ToolCallRequest, ToolResult};

/// Terminal classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model returned a final answer with no further tool calls
    Stop,
    /// The iteration cap was hit before the model stopped calling tools
    MaxIterations,
    /// A fatal failure (adapter error, cancellation, timeout) aborted the run
    Error,
}

/// One tool call request paired with its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub request: ToolCallRequest,
    pub result: ToolResult,
}

/// The terminal result of a run. Built exactly once, at loop
/// termination, and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub run_id: String,
    /// The final assistant content (last assistant message of the run)
    pub content: String,
    /// Every tool call of the run, in issue order across all rounds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    pub finish_reason: FinishReason,
    /// Final content parsed against the configured output schema, when
    /// one was configured and the content matched it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub usage: Usage,
    pub duration_ms: u64,
}

/// Accumulates run activity and assembles the terminal result.
pub(crate) struct RunRecorder {
    run_id: String,
    started: Instant,
    content: String,
    records: Vec<ToolCallRecord>,
    usage: Usage,
}

impl RunRecorder {
    pub(crate) fn new() -> Self {
        RunRecorder {
            run_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
            content: String::new(),
            records: Vec::new(),
            usage: Usage::default(),
        }
    }

    pub(crate) fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Retain the latest assistant content as the candidate final answer
    pub(crate) fn set_content<S: Into<String>>(&mut self, content: S) {
        self.content = content.into();
    }

    pub(crate) fn record_usage(&mut self, usage: &Usage) {
        self.usage.add(usage);
    }

    /// Record one completed round of tool calls, in request order
    pub(crate) fn record_round(
        &mut self,
        requests: Vec<ToolCallRequest>,
        results: Vec<ToolResult>,
    ) {
        for (request, result) in requests.into_iter().zip(results) {
            self.records.push(ToolCallRecord { request, result });
        }
    }

    /// Assemble the terminal result for the given ending condition.
    pub(crate) fn finish(
        self,
        finish_reason: FinishReason,
        error: Option<AgentError>,
        output_schema: Option<&Value>,
    ) -> AgentRunResult {
        let structured = output_schema.and_then(|schema| parse_structured(schema, &self.content));

        AgentRunResult {
            run_id: self.run_id,
            content: self.content,
            tool_calls: self.records,
            finish_reason,
            structured,
            error: error.map(|e| e.to_string()),
            usage: self.usage,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// Parse the final content against the output schema. A miss is never
/// fatal; it only leaves the structured field unset.
fn parse_structured(schema: &Value, content: &str) -> Option<Value> {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "final content is not valid JSON, skipping structured output");
            return None;
        }
    };
    match validate_against_schema(schema, &value) {
        Ok(()) => Some(value),
        Err(detail) => {
            debug!(detail = %detail, "final content does not match output schema");
            None
        }
    }
}
