//! Payment-closed listener.
//!
//! [`PaymentClosedListener`] runs as a background task, pulling batches from
//! a [`MessageSource`] and turning each closed payment into a preparation
//! intake. Every delivered message is acknowledged once handled, whether the
//! intake succeeded or not; failures are logged and the message is dropped.

use std::sync::Arc;
use std::time::Duration;

use preparation_core::error::CoreError;
use preparation_core::service::PreparationService;
use tokio_util::sync::CancellationToken;

use crate::message::PaymentClosedMessage;
use crate::source::{InboundMessage, MessageSource};

/// Pause after a failed receive before polling again.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Why a single message could not be turned into an intake.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("Malformed payment-closed message: {0}")]
    Message(#[from] serde_json::Error),

    #[error("Intake failed: {0}")]
    Intake(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// PaymentClosedListener
// ---------------------------------------------------------------------------

/// Background consumer of payment-closed notifications.
pub struct PaymentClosedListener<S> {
    source: S,
    service: Arc<PreparationService>,
    retry_delay: Duration,
}

impl<S: MessageSource> PaymentClosedListener<S> {
    pub fn new(source: S, service: Arc<PreparationService>) -> Self {
        Self {
            source,
            service,
            retry_delay: RECEIVE_RETRY_DELAY,
        }
    }

    /// Override the pause after a failed receive.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Run the receive loop until `cancel` fires.
    ///
    /// A batch that is already being handled is finished before the loop
    /// exits, so no message is left half-processed.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!("Payment-closed listener started");

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.source.receive() => received,
            };

            match received {
                Ok(batch) => self.process_batch(batch).await,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive payment-closed messages");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        tracing::info!("Payment-closed listener cancelled");
    }

    /// Handle and acknowledge each message of a batch in order.
    pub async fn process_batch(&self, batch: Vec<InboundMessage>) {
        for message in &batch {
            if let Err(e) = self.handle(message).await {
                tracing::error!(
                    message_id = %message.id,
                    error = %e,
                    "Dropping payment-closed message"
                );
            }

            if let Err(e) = self.source.acknowledge(message).await {
                tracing::warn!(error = %e, "Message will be redelivered");
            }
        }
    }

    /// Decode one message and take its payment in as a preparation.
    async fn handle(&self, message: &InboundMessage) -> Result<(), HandleError> {
        let event = PaymentClosedMessage::from_body(&message.body)?;
        let preparation = self.service.intake(&event.payment_id).await?;

        tracing::info!(
            message_id = %message.id,
            preparation_id = %preparation.id,
            position = ?preparation.position,
            "Payment-closed message handled"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use preparation_core::memory::{FixedOrderInfoProvider, InMemoryPreparationStore};
    use preparation_core::status::PreparationStatus;
    use preparation_core::store::PreparationStore;

    use super::*;
    use crate::source::SourceError;

    /// Queue double: hands out scripted batches, records acknowledgements,
    /// and cancels the listener once the script runs out.
    struct ScriptedSource {
        batches: Mutex<VecDeque<Result<Vec<InboundMessage>, SourceError>>>,
        acked: Mutex<Vec<String>>,
        fail_ack: bool,
        cancel: CancellationToken,
    }

    impl ScriptedSource {
        fn new(
            batches: Vec<Result<Vec<InboundMessage>, SourceError>>,
            cancel: CancellationToken,
        ) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                acked: Mutex::new(Vec::new()),
                fail_ack: false,
                cancel,
            }
        }

        fn acked(&self) -> Vec<String> {
            self.acked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageSource for ScriptedSource {
        async fn receive(&self) -> Result<Vec<InboundMessage>, SourceError> {
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => {
                    self.cancel.cancel();
                    std::future::pending().await
                }
            }
        }

        async fn acknowledge(&self, message: &InboundMessage) -> Result<(), SourceError> {
            self.acked.lock().unwrap().push(message.id.clone());
            if self.fail_ack {
                return Err(SourceError::Acknowledge {
                    id: message.id.clone(),
                    reason: "gone".to_string(),
                });
            }
            Ok(())
        }
    }

    fn envelope(id: &str, payment_id: &str) -> InboundMessage {
        let inner = serde_json::json!({ "payment_id": payment_id }).to_string();
        InboundMessage {
            id: id.to_string(),
            receipt: format!("receipt-{id}"),
            body: serde_json::json!({ "Type": "Notification", "Message": inner }).to_string(),
        }
    }

    fn raw(id: &str, body: &str) -> InboundMessage {
        InboundMessage {
            id: id.to_string(),
            receipt: format!("receipt-{id}"),
            body: body.to_string(),
        }
    }

    fn service(store: Arc<InMemoryPreparationStore>) -> Arc<PreparationService> {
        let orders = FixedOrderInfoProvider::new()
            .with_order("pay-1", 10)
            .with_order("pay-2", 5);
        Arc::new(PreparationService::new(store, Arc::new(orders)))
    }

    #[tokio::test]
    async fn each_closed_payment_becomes_a_received_preparation() {
        let store = Arc::new(InMemoryPreparationStore::new());
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Ok(vec![envelope("m-1", "pay-1")]),
                Ok(vec![]),
                Ok(vec![envelope("m-2", "pay-2")]),
            ],
            cancel.clone(),
        );
        let listener = PaymentClosedListener::new(source, service(Arc::clone(&store)));

        listener.run(cancel).await;

        let first = store.find_by_id("pay-1").await.unwrap();
        let second = store.find_by_id("pay-2").await.unwrap();
        assert_eq!(first.status, PreparationStatus::Received);
        assert_eq!(first.position, Some(1));
        assert_eq!(second.position, Some(2));
        assert_eq!(second.preparation_duration, 5);
        assert_eq!(listener.source.acked(), vec!["m-1", "m-2"]);
    }

    #[tokio::test]
    async fn failed_messages_are_still_acknowledged() {
        let store = Arc::new(InMemoryPreparationStore::new());
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![
                raw("bad-json", "not json"),
                envelope("unknown-order", "pay-404"),
                envelope("ok", "pay-1"),
                envelope("duplicate", "pay-1"),
            ])],
            cancel.clone(),
        );
        let listener = PaymentClosedListener::new(source, service(Arc::clone(&store)));

        listener.run(cancel).await;

        assert_eq!(
            listener.source.acked(),
            vec!["bad-json", "unknown-order", "ok", "duplicate"]
        );
        assert_eq!(store.len().await, 1);
        assert_eq!(store.find_by_id("pay-1").await.unwrap().position, Some(1));
    }

    #[tokio::test]
    async fn receive_errors_are_retried() {
        let store = Arc::new(InMemoryPreparationStore::new());
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Err(SourceError::Receive("throttled".to_string())),
                Ok(vec![envelope("m-1", "pay-1")]),
            ],
            cancel.clone(),
        );
        let listener = PaymentClosedListener::new(source, service(Arc::clone(&store)))
            .with_retry_delay(Duration::from_millis(10));

        listener.run(cancel).await;

        assert_eq!(listener.source.acked(), vec!["m-1"]);
        assert!(store.exists_by_id("pay-1").await.unwrap());
    }

    #[tokio::test]
    async fn acknowledge_failure_does_not_stop_the_batch() {
        let store = Arc::new(InMemoryPreparationStore::new());
        let cancel = CancellationToken::new();
        let mut source = ScriptedSource::new(
            vec![Ok(vec![envelope("m-1", "pay-1"), envelope("m-2", "pay-2")])],
            cancel.clone(),
        );
        source.fail_ack = true;
        let listener = PaymentClosedListener::new(source, service(Arc::clone(&store)));

        listener.run(cancel).await;

        assert_eq!(listener.source.acked(), vec!["m-1", "m-2"]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn cancelled_listener_exits_immediately() {
        let store = Arc::new(InMemoryPreparationStore::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedSource::new(vec![Ok(vec![envelope("m-1", "pay-1")])], cancel.clone());
        let listener = PaymentClosedListener::new(source, service(Arc::clone(&store)));

        listener.run(cancel).await;

        assert!(store.is_empty().await);
    }
}
