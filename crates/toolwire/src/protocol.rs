//! Tool provider wire types.
//!
//! Every request is a `{method, params}` envelope posted to the provider.
//! Responses are either a success body or an `{error: {message}}` envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// Request method understood by a tool provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    List,
    Call,
}

/// Request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub method: Method,
    pub params: Value,
}

impl Request {
    pub fn new(method: Method, params: impl Serialize) -> Result<Self> {
        Ok(Self {
            method,
            params: serde_json::to_value(params)?,
        })
    }

    /// A `list` request with empty params.
    pub fn list() -> Self {
        Self {
            method: Method::List,
            params: json!({}),
        }
    }
}

/// Error envelope returned by a provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = &self.message;
        match &self.code {
            Some(code) => write!(f, "[{code}] {message}"),
            None => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Generic response: an error envelope or `{result: T}`.
///
/// `Failure` is tried first so a body carrying both keys counts as an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Failure { error: ProviderError },
    Success { result: T },
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Failure { error } => Err(Error::Provider(error)),
            Self::Success { result } => Ok(result),
        }
    }
}

/// Tool descriptor returned by `list`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Body of a successful `list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// `list` responses come bare (`{tools}`) or wrapped (`{result: {tools}}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse {
    Failure { error: ProviderError },
    Wrapped { result: ListToolsResult },
    Bare(ListToolsResult),
}

impl ListResponse {
    pub fn into_tools(self) -> Result<Vec<Tool>> {
        match self {
            Self::Failure { error } => Err(Error::Provider(error)),
            Self::Wrapped { result } | Self::Bare(result) => Ok(result.tools),
        }
    }
}

/// Params for `call`.
#[derive(Debug, Clone, Serialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Value,
}

/// A typed content block, as emitted by MCP-style providers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        uri: String,
        #[serde(default, rename = "mimeType")]
        mime_type: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
}

impl ContentBlock {
    /// Get text content if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// An MCP-style call result object.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

/// The shapes a `call` result payload arrives in.
///
/// Variant order matters: anything that is not a string or a recognizable
/// block list falls through to `Other` untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CallOutput {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Content(ContentResult),
    Other(Value),
}

impl CallOutput {
    /// Collapse the provider's payload into a single [`Payload`].
    ///
    /// An MCP-style result flagged `isError` becomes [`Error::ToolFailed`].
    pub fn normalize(self) -> Result<Payload> {
        match self {
            Self::Text(text) => Ok(Payload::Text(text)),
            Self::Blocks(blocks) => Ok(Payload::from_blocks(blocks)),
            Self::Content(result) if result.is_error => {
                Err(Error::ToolFailed(join_text(&result.content)))
            }
            Self::Content(result) => Ok(Payload::from_blocks(result.content)),
            Self::Other(value) => Ok(Payload::Json(value)),
        }
    }
}

fn join_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(ContentBlock::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A normalized tool result: plain text or structured JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        if blocks.is_empty() {
            return Self::Json(Value::Array(Vec::new()));
        }
        if blocks.iter().all(|b| b.as_text().is_some()) {
            return Self::Text(join_text(&blocks));
        }
        let values = blocks
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => json!({"type": "text", "text": text}),
                ContentBlock::Image { data, mime_type } => {
                    json!({"type": "image", "data": data, "mimeType": mime_type})
                }
                ContentBlock::Resource {
                    uri,
                    mime_type,
                    text,
                } => json!({"type": "resource", "uri": uri, "mimeType": mime_type, "text": text}),
            })
            .collect();
        Self::Json(Value::Array(values))
    }

    /// Render for a model: text as-is, JSON compact.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }
}
