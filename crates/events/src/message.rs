//! Payment-closed notification payloads.
//!
//! Notifications arrive through an SNS topic subscription, so the queue body
//! is an envelope whose `Message` field holds the event JSON as a string:
//!
//! ```json
//! { "Type": "Notification", "Message": "{\"payment_id\": \"pay-1\"}" }
//! ```
//!
//! Raw (non-enveloped) bodies are accepted as well.

use serde::Deserialize;
use serde_json::Value;

/// A closed payment; its id becomes the preparation id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentClosedMessage {
    #[serde(alias = "paymentId")]
    pub payment_id: String,
}

impl PaymentClosedMessage {
    /// Decode a queue message body, unwrapping the SNS envelope if present.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;
        match value.get("Message").and_then(Value::as_str) {
            Some(inner) => serde_json::from_str(inner),
            None => serde_json::from_value(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_sns_envelope() {
        let body = r#"{"Type":"Notification","MessageId":"m-1","Message":"{\"payment_id\":\"pay-1\"}"}"#;
        assert_eq!(
            PaymentClosedMessage::from_body(body).unwrap().payment_id,
            "pay-1"
        );
    }

    #[test]
    fn accepts_camel_case_field() {
        let body = r#"{"Message":"{\"paymentId\":\"pay-2\"}"}"#;
        assert_eq!(
            PaymentClosedMessage::from_body(body).unwrap().payment_id,
            "pay-2"
        );
    }

    #[test]
    fn accepts_raw_body() {
        let body = r#"{"payment_id":"pay-3","amount":12.5}"#;
        assert_eq!(
            PaymentClosedMessage::from_body(body).unwrap().payment_id,
            "pay-3"
        );
    }

    #[test]
    fn rejects_missing_payment_id() {
        assert!(PaymentClosedMessage::from_body(r#"{"Message":"{}"}"#).is_err());
        assert!(PaymentClosedMessage::from_body("not json").is_err());
        assert!(PaymentClosedMessage::from_body(r#"{"Message":"nope"}"#).is_err());
    }
}
