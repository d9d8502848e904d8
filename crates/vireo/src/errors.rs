use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Model call failed: {0}")]
    AdapterError(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Run deadline exceeded")]
    TimedOut,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Whether this error aborts the whole run, as opposed to being fed
    /// back into the conversation as a failed tool result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::AdapterError(_)
                | AgentError::Cancelled
                | AgentError::TimedOut
                | AgentError::Internal(_)
        )
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
