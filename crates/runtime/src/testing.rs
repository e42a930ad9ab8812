//! Scripted test doubles for the agent loop and streaming adapter.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use toolwire::Payload;

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, StopReason, ToolCall,
    ToolResult, ToolSpec, Usage,
};
use crate::stream::{ClientMessage, SinkError, TransportSink};
use crate::tools::{ToolError, ToolHost, ToolSession};

/// A completion request as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
}

/// Backend that replays scripted responses and records every request.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    repeat: Option<ModelResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<ModelResponse, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A backend that answers every request with the same response.
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system: request.system.to_string(),
            messages: request.messages.to_vec(),
            tools: request.tools.to_vec(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.repeat) {
            (Some(response), _) => response,
            (None, Some(response)) => Ok(response.clone()),
            (None, None) => Err(ModelError::InvalidResponse("script exhausted".into())),
        }
    }
}

/// Backend whose every call panics.
pub struct PanickingBackend;

impl Backend for PanickingBackend {
    async fn call(&self, _request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        panic!("backend exploded")
    }
}

/// A final answer with no tool calls.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        message: Message {
            role: Role::Assistant,
            parts: vec![Part::Text(text.to_string())],
        },
        stop_reason: StopReason::EndTurn,
        usage: Usage::default(),
    }
}

/// A response requesting tool calls, optionally preceded by text.
pub fn tool_response(text: Option<&str>, calls: &[(&str, &str, Value)]) -> ModelResponse {
    let mut parts: Vec<Part> = text.map(|t| Part::Text(t.to_string())).into_iter().collect();
    parts.extend(calls.iter().map(|(id, name, input)| {
        Part::ToolCall(ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input: input.clone(),
        })
    }));

    ModelResponse {
        message: Message {
            role: Role::Assistant,
            parts,
        },
        stop_reason: StopReason::ToolUse,
        usage: Usage::default(),
    }
}

/// Tool host with canned outcomes that logs every discover/invoke.
pub struct ScriptedToolHost {
    catalog: Result<Vec<ToolSpec>, ToolError>,
    outcomes: HashMap<String, Result<Payload, ToolError>>,
    log: Arc<Mutex<Vec<String>>>,
    opened: AtomicUsize,
}

impl ScriptedToolHost {
    pub fn new(names: &[&str]) -> Self {
        let catalog = names
            .iter()
            .map(|name| ToolSpec {
                name: name.to_string(),
                description: format!("{name} tool"),
                schema: serde_json::json!({"type": "object"}),
            })
            .collect();
        Self::with_catalog(Ok(catalog))
    }

    pub fn unavailable(error: ToolError) -> Self {
        Self::with_catalog(Err(error))
    }

    fn with_catalog(catalog: Result<Vec<ToolSpec>, ToolError>) -> Self {
        Self {
            catalog,
            outcomes: HashMap::new(),
            log: Arc::new(Mutex::new(Vec::new())),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn with_outcome(mut self, name: &str, outcome: Result<Payload, ToolError>) -> Self {
        self.outcomes.insert(name.to_string(), outcome);
        self
    }

    /// `discover` and `invoke:<name>` entries across all sessions, in call order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ToolHost for ScriptedToolHost {
    type Session = ScriptedSession;

    fn open(&self) -> ScriptedSession {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        ScriptedSession {
            id: format!("scripted-{n}"),
            catalog: self.catalog.clone(),
            outcomes: self.outcomes.clone(),
            log: Arc::clone(&self.log),
        }
    }
}

pub struct ScriptedSession {
    id: String,
    catalog: Result<Vec<ToolSpec>, ToolError>,
    outcomes: HashMap<String, Result<Payload, ToolError>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl ToolSession for ScriptedSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn discover(&mut self) -> Result<Vec<ToolSpec>, ToolError> {
        self.log.lock().unwrap().push("discover".to_string());
        self.catalog.clone()
    }

    async fn invoke(&self, call: &ToolCall) -> ToolResult {
        self.log
            .lock()
            .unwrap()
            .push(format!("invoke:{}", call.name));
        match self.outcomes.get(&call.name) {
            Some(Ok(payload)) => ToolResult::success(&call.id, payload.clone()),
            Some(Err(error)) => ToolResult::failure(&call.id, error.clone()),
            None => ToolResult::failure(&call.id, ToolError::NotFound(call.name.clone())),
        }
    }
}

/// Sink that records every delivery attempt.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, ClientMessage)>>,
    failing: bool,
}

impl RecordingSink {
    /// A sink whose peer is gone; sends are recorded and then fail.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn messages(&self) -> Vec<ClientMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn sessions(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(session, _)| session.clone())
            .collect()
    }
}

impl TransportSink for RecordingSink {
    async fn send(&self, session_id: &str, message: &ClientMessage) -> Result<(), SinkError> {
        self.sent
            .lock()
            .unwrap()
            .push((session_id.to_string(), message.clone()));
        if self.failing {
            Err(SinkError::Gone)
        } else {
            Ok(())
        }
    }
}
