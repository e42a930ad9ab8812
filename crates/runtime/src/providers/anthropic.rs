//! Anthropic Messages API backend.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, StopReason, ToolCall,
    ToolResult, ToolSpec, Usage,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Authentication mode for the Anthropic API.
#[derive(Debug, Clone)]
pub enum AnthropicAuth {
    /// Standard API key, sent as `x-api-key`.
    ApiKey(String),
    /// Bearer token, for gateways that front the API.
    Bearer(String),
}

impl std::fmt::Display for AnthropicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "api_key"),
            Self::Bearer(_) => write!(f, "bearer"),
        }
    }
}

impl AnthropicAuth {
    fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiKey(key) => req.header("x-api-key", key),
            Self::Bearer(token) => req.bearer_auth(token),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    auth: AnthropicAuth,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicBackendBuilder {
    pub fn new(auth: AnthropicAuth, model: impl Into<String>) -> Self {
        Self {
            auth,
            model: model.into(),
            max_tokens: 4096,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn build(self) -> AnthropicBackend {
        let base_url = self.base_url.trim_end_matches('/');
        AnthropicBackend {
            client: reqwest::Client::new(),
            endpoint: format!("{base_url}/v1/messages"),
            auth: self.auth,
            model: self.model,
            max_tokens: self.max_tokens,
        }
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    endpoint: String,
    auth: AnthropicAuth,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn builder(auth: AnthropicAuth, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(auth, model)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User | Role::Tool => "user",
            Role::Assistant => "assistant",
        }
    }

    fn part_to_api(part: &Part) -> ApiContentBlock {
        match part {
            Part::Text(text) => ApiContentBlock::Text { text: text.clone() },
            Part::ToolCall(call) => ApiContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            },
            Part::ToolResult(result) => {
                let (content, is_error) = match result {
                    ToolResult::Success { output, .. } => (output.render(), false),
                    ToolResult::Failure { error, .. } => (error.to_string(), true),
                };
                ApiContentBlock::ToolResult {
                    tool_use_id: result.tool_call_id().to_string(),
                    content,
                    is_error,
                }
            }
        }
    }

    /// Convert turns to API messages.
    ///
    /// Consecutive tool turns are merged into a single `user` message: the
    /// API expects every result for one assistant turn in the next message.
    fn messages_to_api(messages: &[Message]) -> Vec<ApiMessage> {
        let mut api_messages: Vec<ApiMessage> = Vec::with_capacity(messages.len());
        let mut previous_role = None;

        for msg in messages {
            let blocks: Vec<ApiContentBlock> = msg.parts.iter().map(Self::part_to_api).collect();

            if msg.role == Role::Tool && previous_role == Some(Role::Tool) {
                if let Some(ApiMessage {
                    content: ApiContent::Blocks(existing),
                    ..
                }) = api_messages.last_mut()
                {
                    existing.extend(blocks);
                    continue;
                }
            }
            previous_role = Some(msg.role);

            let content = match msg.parts.as_slice() {
                [Part::Text(text)] if msg.role != Role::Tool => ApiContent::Text(text.clone()),
                _ => ApiContent::Blocks(blocks),
            };
            api_messages.push(ApiMessage {
                role: Self::role_to_api(msg.role),
                content,
            });
        }

        api_messages
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.schema.clone(),
        }
    }

    fn response_to_message(blocks: Vec<ApiResponseBlock>) -> Message {
        let parts: Vec<Part> = blocks
            .into_iter()
            .filter_map(|block| match block {
                ApiResponseBlock::Text { text } => Some(Part::Text(text)),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    Some(Part::ToolCall(ToolCall { id, name, input }))
                }
                ApiResponseBlock::Unknown => None,
            })
            .collect();

        Message {
            role: Role::Assistant,
            parts,
        }
    }

    fn status_error(status: StatusCode, body: String) -> ModelError {
        let detail = format!("{status}: {body}");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelError::Unauthorized(detail),
            StatusCode::TOO_MANY_REQUESTS => ModelError::RateLimited(detail),
            _ => ModelError::Api(detail),
        }
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({}, auth={})", self.model, self.auth)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: Self::messages_to_api(request.messages),
            system: (!request.system.is_empty()).then_some(request.system),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        let req = self
            .client
            .post(&self.endpoint)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json");

        let req = self.auth.apply_headers(req);

        let response = req
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let stop_reason = api_response
            .stop_reason
            .as_deref()
            .map(StopReason::from_api)
            .unwrap_or_default();
        let usage = Usage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        };
        debug!(
            ?stop_reason,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "completion received"
        );

        Ok(ModelResponse {
            message: Self::response_to_message(api_response.content),
            stop_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use serde_json::json;
    use toolwire::Payload;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> AnthropicBackend {
        AnthropicBackend::builder(AnthropicAuth::ApiKey("test_api_key".into()), "claude-test")
            .base_url(server.uri())
            .build()
    }

    fn specs() -> Vec<ToolSpec> {
        vec![ToolSpec {
            name: "get_schema".into(),
            description: "Describe tables".into(),
            schema: json!({"type": "object"}),
        }]
    }

    #[test]
    fn auth_display() {
        let api = AnthropicAuth::ApiKey("test".into());
        let bearer = AnthropicAuth::Bearer("test".into());
        assert_eq!(api.to_string(), "api_key");
        assert_eq!(bearer.to_string(), "bearer");
    }

    #[test]
    fn consecutive_tool_turns_are_merged() {
        let messages = vec![
            Message::user("chart it"),
            Message {
                role: Role::Assistant,
                parts: vec![
                    Part::ToolCall(ToolCall {
                        id: "a".into(),
                        name: "get_schema".into(),
                        input: json!({}),
                    }),
                    Part::ToolCall(ToolCall {
                        id: "b".into(),
                        name: "execute_sql".into(),
                        input: json!({"query": "SELECT 1"}),
                    }),
                ],
            },
            Message::tool_result(ToolResult::success("a", Payload::Text("[]".into()))),
            Message::tool_result(ToolResult::failure(
                "b",
                ToolError::Execution("syntax error".into()),
            )),
        ];

        let api = serde_json::to_value(AnthropicBackend::messages_to_api(&messages)).unwrap();
        let api = api.as_array().unwrap();

        assert_eq!(api.len(), 3);
        assert_eq!(api[0]["content"], "chart it");
        assert_eq!(api[2]["role"], "user");
        let results = api[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["type"], "tool_result");
        assert!(results[0].get("is_error").is_none());
        assert_eq!(results[1]["tool_use_id"], "b");
        assert_eq!(results[1]["is_error"], true);
        assert_eq!(results[1]["content"], "execution failed: syntax error");
    }

    #[tokio::test]
    async fn parses_text_and_tool_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test_api_key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "system": "Build charts."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Checking the schema."},
                    {"type": "tool_use", "id": "toolu_1", "name": "get_schema", "input": {}}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 12, "output_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let messages = vec![Message::user("chart patients by age")];
        let tools = specs();
        let response = backend(&server)
            .call(ModelRequest {
                system: "Build charts.",
                messages: &messages,
                tools: &tools,
            })
            .await
            .unwrap();

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.message.text(), "Checking the schema.");
        let calls = response.message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(response.usage.output_tokens, 15);

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["tools"][0]["name"], "get_schema");
        assert_eq!(sent["tools"][0]["input_schema"]["type"], "object");
    }

    async fn failing_call(status: u16) -> ModelError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let messages = vec![Message::user("hi")];
        backend(&server)
            .call(ModelRequest {
                system: "",
                messages: &messages,
                tools: &[],
            })
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        assert!(matches!(failing_call(401).await, ModelError::Unauthorized(_)));
        assert!(matches!(failing_call(429).await, ModelError::RateLimited(_)));
        assert!(matches!(failing_call(500).await, ModelError::Api(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let messages = vec![Message::user("hi")];
        let err = backend(&server)
            .call(ModelRequest {
                system: "",
                messages: &messages,
                tools: &[],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
