//! Tool discovery and invocation.

pub mod errors;
mod host;
mod remote;

pub use errors::ToolError;
pub use host::{ToolHost, ToolSession};
pub use remote::{RemoteSession, RemoteToolHost};
