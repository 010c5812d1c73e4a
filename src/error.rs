//! Error types for the Trinity agent service.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("tool '{0}' not found")]
    ToolNotFound(String),

    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("a tool named '{0}' is already registered")]
    DuplicateTool(String),

    #[error("tool name must not be empty")]
    EmptyToolName,

    #[error("agent '{0}' not found")]
    AgentNotFound(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("task timed out after {0}s")]
    Timeout(u64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
