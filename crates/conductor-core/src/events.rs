//! Progress notifications
//!
//! The manager reports each major transition (delegation start/complete,
//! synthesis start/complete) as a [`ProgressEvent`]. Delivery is best
//! effort: a failing sink is logged and never aborts the operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// A human-readable progress notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub message: String,
    /// Agent the event is about (the manager reports as `manager_agent`)
    pub agent: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            agent: agent.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for progress events
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn send(&self, event: ProgressEvent) -> Result<()>;
}

/// Emit an event, logging and swallowing delivery failures
pub async fn emit(sink: &dyn ProgressSink, agent: &str, message: impl Into<String>) {
    let event = ProgressEvent::new(agent, message);
    if let Err(e) = sink.send(event).await {
        warn!(agent = %agent, error = %e, "Dropped progress event");
    }
}

/// Writes events to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ProgressSink for TracingSink {
    async fn send(&self, event: ProgressEvent) -> Result<()> {
        info!(agent = %event.agent, "{}", event.message);
        Ok(())
    }
}

/// Forwards events over a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn send(&self, event: ProgressEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Error::Sink("progress receiver dropped".to_string()))
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn send(&self, _event: ProgressEvent) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::channel(4);
        emit(&sink, "manager_agent", "Delegating to joke_agent").await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.agent, "manager_agent");
        assert_eq!(event.message, "Delegating to joke_agent");
    }

    #[tokio::test]
    async fn test_closed_channel_is_swallowed() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);

        assert!(matches!(
            sink.send(ProgressEvent::new("a", "b")).await,
            Err(Error::Sink(_))
        ));
        // Must not panic or propagate
        emit(&sink, "manager_agent", "still fine").await;
    }
}
