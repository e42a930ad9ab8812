//! Completion service protocol types and backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, Conversation, Message, ModelRequest, ModelResponse, Part, Role, StopReason,
    ToolCall, ToolResult, ToolSpec, Usage,
};
