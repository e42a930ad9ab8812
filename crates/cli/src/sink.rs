//! Stdout transport: one JSON message per line.

use std::io::ErrorKind;

use runtime::{ClientMessage, SinkError, TransportSink};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tracing::debug;

pub struct StdoutSink {
    out: Mutex<Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportSink for StdoutSink {
    async fn send(&self, session_id: &str, message: &ClientMessage) -> Result<(), SinkError> {
        let mut line =
            serde_json::to_string(message).map_err(|e| SinkError::Delivery(e.to_string()))?;
        line.push('\n');

        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await.map_err(write_error)?;
        out.flush().await.map_err(write_error)?;

        debug!(session = session_id, bytes = line.len(), "message written");
        Ok(())
    }
}

fn write_error(err: std::io::Error) -> SinkError {
    match err.kind() {
        ErrorKind::BrokenPipe => SinkError::Gone,
        _ => SinkError::Delivery(err.to_string()),
    }
}
