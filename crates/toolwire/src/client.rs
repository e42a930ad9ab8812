//! Tool provider client (discover, call, session correlation).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::{
    CallOutput, CallToolParams, Envelope, ListResponse, Method, Payload, Request, Tool,
};

/// Default timeout for a single provider exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum response body size (1MB).
/// Sized for query results that feed a single chart.
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Header carrying the per-session correlation id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Configuration for a tool provider client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint receiving `{method, params}` envelopes.
    pub url: String,
    /// Bearer token attached to every request, if set.
    pub token: Option<String>,
    /// Refuse to contact the provider without a token.
    pub require_token: bool,
    pub timeout: Duration,
    pub max_output_size: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            require_token: false,
            timeout: DEFAULT_TIMEOUT,
            max_output_size: MAX_OUTPUT_SIZE,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn require_token(mut self, required: bool) -> Self {
        self.require_token = required;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_size(mut self, max: usize) -> Self {
        self.max_output_size = max;
        self
    }
}

/// Handle to a remote tool provider.
///
/// The client itself is shareable; provider calls go through a [`Session`]
/// so that every conversation gets its own correlation id.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }

    /// Start a session with a fresh id. The HTTP connection pool is shared.
    pub fn session(&self) -> Session {
        Session {
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            id: Uuid::new_v4().to_string(),
        }
    }
}

/// One conversation with the provider; every request carries its id.
pub struct Session {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    id: String,
}

impl Session {
    /// Get the session id sent with every request.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// List the tools the provider exposes.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let body = self.request(&Request::list()).await?;
        let response: ListResponse = parse(&body)?;
        let tools = response.into_tools()?;
        debug!(count = tools.len(), session = %self.id, "listed provider tools");
        Ok(tools)
    }

    /// Call a tool by name and normalize its payload.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Payload> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let request = Request::new(Method::Call, params)?;

        let body = self.request(&request).await?;
        let envelope: Envelope<CallOutput> = parse(&body)?;
        envelope.into_result()?.normalize()
    }

    // --- Internal methods ---

    async fn request(&self, request: &Request) -> Result<Vec<u8>> {
        if self.config.require_token && self.config.token.is_none() {
            return Err(Error::MissingCredentials);
        }

        timeout(self.config.timeout, self.exchange(request))
            .await
            .map_err(|_| Error::Timeout)?
    }

    async fn exchange(&self, request: &Request) -> Result<Vec<u8>> {
        let mut req = self
            .http
            .post(&self.config.url)
            .header(SESSION_HEADER, &self.id)
            .json(request);
        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token);
        }

        let mut response = req
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status();
        let max = self.config.max_output_size;

        if let Some(declared) = response.content_length().filter(|&len| len > max as u64) {
            return Err(Error::OutputTooLarge {
                size: usize::try_from(declared).unwrap_or(usize::MAX),
                max,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?
        {
            let size = body.len() + chunk.len();
            if size > max {
                return Err(Error::OutputTooLarge { size, max });
            }
            body.extend_from_slice(&chunk);
        }

        if !status.is_success() {
            // Prefer the provider's own error envelope when it sent one.
            if let Ok(Envelope::<Value>::Failure { error }) = serde_json::from_slice(&body) {
                return Err(Error::Provider(error));
            }
            return Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::InvalidResponse(e.to_string()))
}
