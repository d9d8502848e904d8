use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::result::AgentRunResult;
use crate::tool::ToolResult;

/// One unit of the typed event sequence emitted during a run.
///
/// Per tool call id the sequence is strictly `tool-call-start`, zero or
/// more `tool-call-args`, `tool-call-end`, then `tool-result`. Chunks
/// for different ids may interleave, chunks for the same id never
/// reorder. Exactly one `finish` terminates every run, and an `error`
/// chunk, when present, strictly precedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentChunk {
    /// A fragment of assistant text, in generation order
    Content { delta: String },
    /// A tool call was announced by the model
    ToolCallStart { id: String, name: String },
    /// A fragment of the raw argument payload for one call
    ToolCallArgs { id: String, fragment: String },
    /// Argument streaming for one call is complete
    ToolCallEnd { id: String },
    /// The executor produced the result for one call
    ToolResult {
        id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Terminal chunk carrying the completed run result
    Finish { result: AgentRunResult },
    /// A fatal failure; always followed by a final `finish`
    Error { message: String },
}

impl AgentChunk {
    pub(crate) fn tool_result(result: &ToolResult) -> Self {
        AgentChunk::ToolResult {
            id: result.tool_call_id.clone(),
            success: result.success,
            data: result.data.clone(),
            error: result.error.clone(),
        }
    }
}
