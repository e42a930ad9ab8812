//! Remote tool provider client.
//!
//! This crate speaks the tool provider's request/response protocol: a JSON
//! `{method, params}` envelope posted over HTTP, where `method` is `list`
//! (discover tools) or `call` (invoke one).
//!
//! # Example
//!
//! ```no_run
//! use toolwire::{Client, ClientConfig};
//!
//! # async fn example() -> toolwire::Result<()> {
//! let client = Client::new(ClientConfig::new("https://tools.example.com/invoke"));
//! let session = client.session();
//!
//! for tool in session.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let payload = session
//!     .call_tool("get_schema", serde_json::json!({}))
//!     .await?;
//! println!("{}", payload.render());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod protocol;

pub use client::{
    Client, ClientConfig, DEFAULT_TIMEOUT, MAX_OUTPUT_SIZE, SESSION_HEADER, Session,
};
pub use error::{Error, Result};
pub use protocol::{
    CallOutput, CallToolParams, ContentBlock, ContentResult, Envelope, ListResponse,
    ListToolsResult, Method, Payload, ProviderError, Request, Tool,
};
