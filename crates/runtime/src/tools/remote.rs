//! Tool host backed by a remote tool provider.

use std::collections::HashSet;

use serde_json::{Map, Value};
use toolwire::{Client, ClientConfig, Session, Tool};
use tracing::{debug, info, warn};

use super::{ToolError, ToolHost, ToolSession};
use crate::model::{ToolCall, ToolResult, ToolSpec};

/// Tool host that discovers and calls tools over the provider protocol.
pub struct RemoteToolHost {
    client: Client,
}

impl RemoteToolHost {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

impl ToolHost for RemoteToolHost {
    type Session = RemoteSession;

    fn open(&self) -> RemoteSession {
        RemoteSession {
            session: self.client.session(),
            catalog: None,
        }
    }
}

/// One run's view of the provider.
pub struct RemoteSession {
    session: Session,
    /// Names from the last discovery; calls to other names are refused.
    catalog: Option<HashSet<String>>,
}

impl From<Tool> for ToolSpec {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            schema: tool.input_schema,
        }
    }
}

impl ToolSession for RemoteSession {
    fn id(&self) -> &str {
        self.session.id()
    }

    async fn discover(&mut self) -> Result<Vec<ToolSpec>, ToolError> {
        let tools = self.session.list_tools().await?;

        let mut seen = HashSet::new();
        let specs: Vec<ToolSpec> = tools
            .into_iter()
            .filter(|tool| {
                let fresh = seen.insert(tool.name.clone());
                if !fresh {
                    warn!(tool = %tool.name, "duplicate tool name in catalog, keeping first");
                }
                fresh
            })
            .map(ToolSpec::from)
            .collect();

        info!(count = specs.len(), session = %self.id(), "discovered tools");
        self.catalog = Some(seen);
        Ok(specs)
    }

    async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let unknown = self
            .catalog
            .as_ref()
            .is_some_and(|names| !names.contains(&call.name));
        if unknown {
            warn!(tool = %call.name, id = %call.id, "call to a tool outside the catalog");
            return ToolResult::failure(&call.id, ToolError::NotFound(call.name.clone()));
        }

        let arguments = match arguments(&call.input) {
            Ok(arguments) => arguments,
            Err(error) => return ToolResult::failure(&call.id, error),
        };

        match self.session.call_tool(&call.name, arguments).await {
            Ok(payload) => {
                debug!(tool = %call.name, id = %call.id, "tool call succeeded");
                ToolResult::success(&call.id, payload)
            }
            Err(e) => {
                warn!(tool = %call.name, id = %call.id, error = %e, "tool call failed");
                ToolResult::failure(&call.id, e.into())
            }
        }
    }
}

/// Tool arguments must be a JSON object; a missing input counts as `{}`.
fn arguments(input: &Value) -> Result<Value, ToolError> {
    match input {
        Value::Object(_) => Ok(input.clone()),
        Value::Null => Ok(Value::Object(Map::new())),
        other => Err(ToolError::InvalidInput(format!(
            "expected an object, got {other}"
        ))),
    }
}
