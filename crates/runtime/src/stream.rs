//! Streaming adapter.
//!
//! Runs an agent on its own task and relays its events to a client as
//! [`ClientMessage`]s: model reasoning becomes `thought`s, and the run ends
//! with exactly one `result` or `error`. Sink failures are logged and never
//! stop the run.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::agent::Agent;
use crate::event::AgentEvent;
use crate::extract;
use crate::model::Backend;
use crate::tools::ToolHost;

const EVENT_BUFFER: usize = 32;

/// Sent when the run ends without a terminal event, e.g. on a panic.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

/// A message delivered to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Intermediate reasoning.
    Thought { content: String },
    /// The structured final answer.
    Result { data: Value },
    /// The run failed; `message` is safe to show to the user.
    Error { message: String },
}

impl ClientMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Thought { .. })
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Thought { .. } => "thought",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("client is gone")]
    Gone,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outbound channel to a client session.
pub trait TransportSink: Send + Sync {
    fn send(
        &self,
        session_id: &str,
        message: &ClientMessage,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Start a run in the background and return immediately.
pub fn run<B, T, S>(
    agent: Agent<B, T>,
    prompt: impl Into<String>,
    session_id: impl Into<String>,
    sink: Arc<S>,
) -> JoinHandle<()>
where
    B: Backend + 'static,
    T: ToolHost + 'static,
    S: TransportSink + 'static,
{
    let prompt = prompt.into();
    let session_id = session_id.into();
    tokio::spawn(async move { relay(agent, &prompt, &session_id, sink.as_ref()).await })
}

/// Run the agent and relay its events to `sink` until the run ends.
pub async fn relay<B, T, S>(agent: Agent<B, T>, prompt: &str, session_id: &str, sink: &S)
where
    B: Backend + 'static,
    T: ToolHost + 'static,
    S: TransportSink,
{
    info!(session = session_id, "run started");

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let prompt = prompt.to_string();
    let task = tokio::spawn(async move { agent.run(&prompt, tx).await });

    let mut state = Relay {
        session_id,
        sink,
        finished: false,
    };
    while let Some(event) = rx.recv().await {
        state.handle(event).await;
    }

    if let Err(err) = task.await {
        error!(session = session_id, error = %err, "agent task aborted");
    }
    if !state.finished {
        state
            .finish(ClientMessage::Error {
                message: INTERNAL_ERROR_MESSAGE.to_string(),
            })
            .await;
    }

    info!(session = session_id, "run ended");
}

struct Relay<'a, S> {
    session_id: &'a str,
    sink: &'a S,
    finished: bool,
}

impl<S: TransportSink> Relay<'_, S> {
    async fn handle(&mut self, event: AgentEvent) {
        if self.finished {
            warn!(
                session = self.session_id,
                kind = event.kind(),
                "event after terminal message dropped"
            );
            return;
        }

        match event {
            AgentEvent::AssistantText { text, final_turn } => {
                if text.trim().is_empty() {
                    return;
                }
                if final_turn && extract::is_structured_answer(&text) {
                    debug!(session = self.session_id, "structured answer held for result");
                    return;
                }
                self.deliver(&ClientMessage::Thought { content: text }).await;
            }
            AgentEvent::ToolRequested { call } => {
                info!(session = self.session_id, tool = %call.name, id = %call.id, "tool requested");
            }
            AgentEvent::ToolCompleted { result } => {
                info!(
                    session = self.session_id,
                    id = result.tool_call_id(),
                    failed = result.is_error(),
                    "tool completed"
                );
            }
            AgentEvent::FinalSuccess { text } => {
                let data = extract::extract_result(&text);
                self.finish(ClientMessage::Result { data }).await;
            }
            AgentEvent::FinalFailure { error } => {
                warn!(session = self.session_id, %error, "run failed");
                self.finish(ClientMessage::Error {
                    message: error.user_message(),
                })
                .await;
            }
        }
    }

    async fn finish(&mut self, message: ClientMessage) {
        self.finished = true;
        self.deliver(&message).await;
    }

    async fn deliver(&self, message: &ClientMessage) {
        if let Err(err) = self.sink.send(self.session_id, message).await {
            warn!(
                session = self.session_id,
                kind = message.kind(),
                error = %err,
                "failed to deliver message"
            );
        }
    }
}
