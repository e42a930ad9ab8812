//! Tool host and per-run tool session traits.

use crate::model::{ToolCall, ToolResult, ToolSpec};
use crate::tools::ToolError;
use std::future::Future;

/// Trait for tool execution hosts.
///
/// A host is shared across runs; each run opens its own [`ToolSession`], so
/// correlation ids are never shared between concurrent requests.
pub trait ToolHost: Send + Sync {
    type Session: ToolSession + 'static;

    /// Open a session for one run.
    fn open(&self) -> Self::Session;
}

/// The tools of one run.
///
/// This is the boundary between the agent loop and side effects. Invocation
/// failures are data: `invoke` always yields a [`ToolResult`] so the loop can
/// report the failure back to the model.
pub trait ToolSession: Send + Sync {
    /// Correlation id the provider sees for this session.
    fn id(&self) -> &str;

    /// Fetch the tool catalog.
    fn discover(&mut self) -> impl Future<Output = Result<Vec<ToolSpec>, ToolError>> + Send;

    /// Execute a tool call.
    fn invoke(&self, call: &ToolCall) -> impl Future<Output = ToolResult> + Send;
}
