//! SQS-backed [`MessageSource`].

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;

use crate::source::{InboundMessage, MessageSource, SourceError};

/// Long-poll wait per receive call (SQS maximum is 20).
const DEFAULT_WAIT_TIME_SECS: i32 = 20;

/// How long a received message stays hidden from other consumers.
const DEFAULT_VISIBILITY_TIMEOUT_SECS: i32 = 30;

/// Messages fetched per receive call (SQS maximum is 10).
const DEFAULT_MAX_MESSAGES: i32 = 10;

/// Settings for the payment-closed queue.
#[derive(Debug, Clone)]
pub struct SqsListenerConfig {
    pub queue_name: String,
    pub wait_time_secs: i32,
    pub visibility_timeout_secs: i32,
    pub max_messages: i32,
}

impl SqsListenerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                                  | Default    |
    /// |------------------------------------------|------------|
    /// | `PAYMENT_CLOSED_QUEUE_NAME`              | (required) |
    /// | `PAYMENT_CLOSED_WAIT_TIME_SECS`          | `20`       |
    /// | `PAYMENT_CLOSED_VISIBILITY_TIMEOUT_SECS` | `30`       |
    /// | `PAYMENT_CLOSED_MAX_MESSAGES`            | `10`       |
    ///
    /// AWS credentials and region come from the standard AWS environment.
    pub fn from_env() -> Self {
        let queue_name = std::env::var("PAYMENT_CLOSED_QUEUE_NAME")
            .expect("PAYMENT_CLOSED_QUEUE_NAME must be set");

        Self {
            queue_name,
            wait_time_secs: env_i32("PAYMENT_CLOSED_WAIT_TIME_SECS", DEFAULT_WAIT_TIME_SECS),
            visibility_timeout_secs: env_i32(
                "PAYMENT_CLOSED_VISIBILITY_TIMEOUT_SECS",
                DEFAULT_VISIBILITY_TIMEOUT_SECS,
            ),
            max_messages: env_i32("PAYMENT_CLOSED_MAX_MESSAGES", DEFAULT_MAX_MESSAGES),
        }
    }
}

fn env_i32(key: &str, default: i32) -> i32 {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid i32")),
        Err(_) => default,
    }
}

/// Receives payment-closed notifications from an SQS queue.
pub struct SqsMessageSource {
    client: Client,
    queue_url: String,
    config: SqsListenerConfig,
}

impl SqsMessageSource {
    /// Resolve the queue URL for `config.queue_name` using the default AWS
    /// configuration chain.
    pub async fn connect(config: SqsListenerConfig) -> Result<Self, SourceError> {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&sdk_config);

        let output = client
            .get_queue_url()
            .queue_name(&config.queue_name)
            .send()
            .await
            .map_err(|e| SourceError::Connect(DisplayErrorContext(e).to_string()))?;
        let queue_url = output
            .queue_url
            .ok_or_else(|| SourceError::Connect(format!("no URL for queue {}", config.queue_name)))?;

        tracing::info!(queue = %config.queue_name, %queue_url, "Connected to payment-closed queue");
        Ok(Self {
            client,
            queue_url,
            config,
        })
    }
}

#[async_trait]
impl MessageSource for SqsMessageSource {
    async fn receive(&self) -> Result<Vec<InboundMessage>, SourceError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.config.max_messages)
            .wait_time_seconds(self.config.wait_time_secs)
            .visibility_timeout(self.config.visibility_timeout_secs)
            .send()
            .await
            .map_err(|e| SourceError::Receive(DisplayErrorContext(e).to_string()))?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                // Without a receipt handle the delivery cannot be acknowledged.
                let receipt = m.receipt_handle?;
                Some(InboundMessage {
                    id: m.message_id.unwrap_or_default(),
                    receipt,
                    body: m.body.unwrap_or_default(),
                })
            })
            .collect();
        Ok(messages)
    }

    async fn acknowledge(&self, message: &InboundMessage) -> Result<(), SourceError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt)
            .send()
            .await
            .map_err(|e| SourceError::Acknowledge {
                id: message.id.clone(),
                reason: DisplayErrorContext(e).to_string(),
            })?;
        Ok(())
    }
}
