use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::tool::{validate_against_schema, Tool, ToolCallRequest, ToolResult};

/// Tools by name. Built once per agent, then shared read-only.
pub type ToolRegistry = HashMap<String, Arc<dyn Tool>>;

/// Execute a single tool call. Never errors out: unknown names,
/// malformed arguments, and tool failures all come back as a failed
/// `ToolResult` so the model can retry with corrected input.
pub async fn execute_tool(request: &ToolCallRequest, registry: &ToolRegistry) -> ToolResult {
    let Some(tool) = registry.get(&request.name) else {
        warn!(
            tool_call_id = %request.id,
            tool_name = %request.name,
            "unknown tool requested"
        );
        return ToolResult::failure(&request.id, format!("unknown tool: {}", request.name));
    };

    let arguments: Value = if request.arguments.trim().is_empty() {
        // An absent payload means a no-argument call
        json!({})
    } else {
        match serde_json::from_str(&request.arguments) {
            Ok(value) => value,
            Err(e) => {
                return ToolResult::failure(
                    &request.id,
                    format!("invalid tool arguments: {}", e),
                );
            }
        }
    };

    if let Err(detail) = validate_against_schema(&tool.parameters(), &arguments) {
        return ToolResult::failure(&request.id, format!("invalid tool arguments: {}", detail));
    }

    info!(
        tool_call_id = %request.id,
        tool_name = %request.name,
        "executing tool"
    );

    match tool.call(arguments).await {
        Ok(data) => ToolResult::success(&request.id, data),
        Err(e) => {
            warn!(
                tool_call_id = %request.id,
                tool_name = %request.name,
                error = %e,
                "tool execution failed"
            );
            ToolResult::failure(&request.id, e.to_string())
        }
    }
}

/// Dispatch every request of one round concurrently and wait for all of
/// them. Results come back in request order; one failure never aborts
/// its siblings.
pub async fn execute_round(
    requests: &[ToolCallRequest],
    registry: &ToolRegistry,
) -> Vec<ToolResult> {
    let futures: Vec<_> = requests
        .iter()
        .map(|request| execute_tool(request, registry))
        .collect();
    futures::future::join_all(futures).await
}
