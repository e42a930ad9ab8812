//! The agent loop.
//!
//! One run takes a prompt to a final answer: discover the tool catalog once,
//! then alternate model completions and tool calls until the model answers
//! without asking for a tool or the iteration budget runs out. Progress is
//! reported as [`AgentEvent`]s on a channel, ending with exactly one terminal
//! event.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::event::AgentEvent;
use crate::model::{Backend, Conversation, Message, ModelRequest};
use crate::tools::{ToolHost, ToolSession};
use crate::{Error, Result};

/// Default cap on model completions per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Built-in system instructions for chart generation.
pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a data analyst that answers questions by building charts.

Work in three steps:
1. Restate what the user wants to see and which measures and groupings it needs.
2. Inspect the database schema with the available tools before writing any query.
3. Query the data, then answer with a chart definition.

Before each tool call, say briefly what you are about to do and why.

Your final answer must be a single JSON object and nothing else:
{\"type\": \"bar\" | \"line\" | \"pie\" | \"doughnut\" | \"scatter\",
 \"title\": string,
 \"labels\": [string, ...],
 \"datasets\": [{\"label\": string, \"data\": [number, ...]}]}

If the data cannot answer the question, explain why in plain text instead.";

/// Settings for one agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub instructions: String,
    pub max_iterations: u32,
    /// Pause between consecutive completion calls.
    pub call_delay: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            call_delay: None,
        }
    }
}

impl AgentConfig {
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }
}

/// A tool-calling agent over a completion backend and a tool host.
pub struct Agent<B, T> {
    backend: Arc<B>,
    tools: Arc<T>,
    config: Arc<AgentConfig>,
}

impl<B, T> Clone for Agent<B, T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            tools: Arc::clone(&self.tools),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: Backend, T: ToolHost> Agent<B, T> {
    pub fn new(backend: Arc<B>, tools: Arc<T>, config: AgentConfig) -> Self {
        Self {
            backend,
            tools,
            config: Arc::new(config),
        }
    }

    /// Run the agent to completion, reporting progress on `events`.
    ///
    /// Always ends with exactly one `FinalSuccess` or `FinalFailure` event.
    /// A dropped receiver does not stop the run.
    pub async fn run(&self, prompt: &str, events: mpsc::Sender<AgentEvent>) {
        let terminal = match self.drive(prompt, &events).await {
            Ok(text) => {
                info!(chars = text.len(), "agent finished");
                AgentEvent::FinalSuccess { text }
            }
            Err(error) => {
                warn!(%error, "agent run failed");
                AgentEvent::FinalFailure { error }
            }
        };
        emit(&events, terminal).await;
    }

    async fn drive(&self, prompt: &str, events: &mpsc::Sender<AgentEvent>) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let mut session = self.tools.open();
        let catalog = session.discover().await.map_err(Error::Discovery)?;
        info!(tools = catalog.len(), session = session.id(), "tool catalog ready");

        let mut conversation = Conversation::new();
        conversation.push(Message::user(prompt));

        let limit = self.config.max_iterations;
        for round in 1..=limit {
            if let Some(delay) = self.config.call_delay.filter(|_| round > 1) {
                tokio::time::sleep(delay).await;
            }

            debug!(round, turns = conversation.turns().len(), "requesting completion");
            let response = self
                .backend
                .call(ModelRequest {
                    system: &self.config.instructions,
                    messages: conversation.turns(),
                    tools: &catalog,
                })
                .await?;

            let message = response.message;
            let calls = message.tool_calls();
            let final_turn = calls.is_empty();
            for text in message.texts() {
                emit(
                    events,
                    AgentEvent::AssistantText {
                        text: text.to_string(),
                        final_turn,
                    },
                )
                .await;
            }

            if final_turn {
                debug!(round, stop_reason = ?response.stop_reason, "final answer");
                let answer = message.text();
                conversation.push(message);
                return Ok(answer);
            }

            conversation.push(message);
            info!(round, calls = calls.len(), "dispatching tool calls");

            for call in calls {
                emit(events, AgentEvent::ToolRequested { call: call.clone() }).await;
                let result = session.invoke(&call).await;
                if result.is_error() {
                    debug!(tool = %call.name, id = %call.id, "tool failure fed back to model");
                }
                emit(
                    events,
                    AgentEvent::ToolCompleted {
                        result: result.clone(),
                    },
                )
                .await;
                conversation.push(Message::tool_result(result));
            }
        }

        Err(Error::IterationBudgetExceeded { limit })
    }
}

async fn emit(events: &mpsc::Sender<AgentEvent>, event: AgentEvent) {
    let kind = event.kind();
    if events.send(event).await.is_err() {
        debug!(kind, "event receiver dropped");
    }
}
