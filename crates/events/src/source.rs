//! The queue port the listener consumes.

use async_trait::async_trait;

/// One message pulled from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Broker-assigned id, for logging.
    pub id: String,
    /// Token needed to acknowledge (delete) this delivery.
    pub receipt: String,
    pub body: String,
}

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to connect to queue: {0}")]
    Connect(String),

    #[error("Failed to receive messages: {0}")]
    Receive(String),

    #[error("Failed to acknowledge message {id}: {reason}")]
    Acknowledge { id: String, reason: String },
}

/// An at-least-once message queue.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next batch. An empty batch means the wait elapsed.
    async fn receive(&self) -> Result<Vec<InboundMessage>, SourceError>;

    /// Remove a delivered message so it is not redelivered.
    async fn acknowledge(&self, message: &InboundMessage) -> Result<(), SourceError>;
}
