//! Completion service adapters.
//!
//! Each provider implements the backend trait for its specific API.

mod anthropic;

pub use anthropic::{AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder, DEFAULT_BASE_URL};
