use thiserror::Error;

/// Errors from completion service calls.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The provider rejected our credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The provider is throttling requests.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
