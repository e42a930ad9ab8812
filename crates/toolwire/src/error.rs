//! Tool provider error types.

use crate::protocol::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("provider unreachable: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("timeout waiting for response")]
    Timeout,

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("tool reported failure: {0}")]
    ToolFailed(String),

    #[error("session credentials not configured")]
    MissingCredentials,

    #[error("output too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
