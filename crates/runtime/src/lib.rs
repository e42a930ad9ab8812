//! Chartwise runtime: the tool-calling agent loop and its streaming adapter.
//!
//! # Overview
//!
//! - **Agent**: drives a completion [`Backend`] and a [`ToolHost`] from a
//!   prompt to a final answer, emitting [`AgentEvent`]s as it goes.
//! - **Backend**: a completion service that supports tool calls
//!   ([`AnthropicBackend`]).
//! - **ToolHost**: opens a [`ToolSession`] per run, which discovers and
//!   invokes tools ([`RemoteToolHost`] speaks the remote tool protocol).
//! - **stream**: relays a run to a [`TransportSink`] as [`ClientMessage`]s,
//!   ending with exactly one `result` or `error`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use runtime::{Agent, AgentConfig, AnthropicAuth, AnthropicBackend, RemoteToolHost};
//! use runtime::stream::{self, ClientMessage, SinkError, TransportSink};
//! use toolwire::ClientConfig;
//!
//! struct Print;
//!
//! impl TransportSink for Print {
//!     async fn send(&self, session: &str, message: &ClientMessage) -> Result<(), SinkError> {
//!         println!("{session}: {message:?}");
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() {
//! let auth = AnthropicAuth::ApiKey("sk-ant-api01-...".into());
//! let backend = AnthropicBackend::builder(auth, "claude-sonnet-4-20250514").build();
//! let tools = RemoteToolHost::new(ClientConfig::new("http://localhost:8080/mcp"));
//! let agent = Agent::new(Arc::new(backend), Arc::new(tools), AgentConfig::default());
//!
//! stream::run(agent, "Patients per ward", "session-1", Arc::new(Print))
//!     .await
//!     .ok();
//! # }
//! ```

mod agent;
mod error;
mod event;
pub mod extract;
pub mod model;
mod providers;
pub mod stream;
#[cfg(test)]
mod testing;
pub mod tools;

// Agent loop
pub use agent::{Agent, AgentConfig, DEFAULT_INSTRUCTIONS, DEFAULT_MAX_ITERATIONS};
pub use event::AgentEvent;

// Error types
pub use error::{Error, Result};

// Completion service
pub use model::{Backend, Message, ModelError, ToolCall, ToolResult, ToolSpec};
pub use providers::{AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder, DEFAULT_BASE_URL};

// Tools
pub use tools::{RemoteSession, RemoteToolHost, ToolError, ToolHost, ToolSession};

// Streaming
pub use stream::{ClientMessage, SinkError, TransportSink};
