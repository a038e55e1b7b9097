//! Inbound payment-closed events.
//!
//! Every closed payment becomes one preparation intake:
//!
//! - [`message`]: decoding the notification body into a payment id.
//! - [`source`]: the [`MessageSource`] port a queue backend implements.
//! - [`sqs`]: the SQS long-polling backend.
//! - [`listener`]: the receive/handle/acknowledge loop.

pub mod listener;
pub mod message;
pub mod source;
pub mod sqs;

pub use listener::PaymentClosedListener;
pub use message::PaymentClosedMessage;
pub use source::{InboundMessage, MessageSource, SourceError};
pub use sqs::{SqsListenerConfig, SqsMessageSource};
