//! Agent loop events.

use crate::Error;
use crate::model::{ToolCall, ToolResult};

/// Events emitted by the agent loop, in the order they happen.
///
/// Exactly one terminal event (`FinalSuccess` or `FinalFailure`) ends every
/// run, and nothing follows it.
#[derive(Debug)]
pub enum AgentEvent {
    /// A text block from the model. `final_turn` is set when the response
    /// carrying it requested no tools.
    AssistantText { text: String, final_turn: bool },

    /// The model asked for a tool call.
    ToolRequested { call: ToolCall },

    /// A tool call finished, successfully or not.
    ToolCompleted { result: ToolResult },

    /// The model produced its final answer.
    FinalSuccess { text: String },

    /// The run failed.
    FinalFailure { error: Error },
}

impl AgentEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssistantText { .. } => "assistant_text",
            Self::ToolRequested { .. } => "tool_requested",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::FinalSuccess { .. } => "final_success",
            Self::FinalFailure { .. } => "final_failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalSuccess { .. } | Self::FinalFailure { .. })
    }
}
