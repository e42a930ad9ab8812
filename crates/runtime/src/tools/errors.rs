use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during tool discovery or execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("session credentials not configured")]
    MissingCredentials,
    #[error("provider unavailable: {0}")]
    Transport(String),
    #[error("timed out waiting for provider")]
    Timeout,
    #[error("execution failed: {0}")]
    Execution(String),
}

impl From<toolwire::Error> for ToolError {
    fn from(err: toolwire::Error) -> Self {
        match err {
            toolwire::Error::Timeout => Self::Timeout,
            toolwire::Error::MissingCredentials => Self::MissingCredentials,
            toolwire::Error::Provider(e) => Self::Execution(e.message),
            toolwire::Error::ToolFailed(message) => Self::Execution(message),
            other => Self::Transport(other.to_string()),
        }
    }
}
