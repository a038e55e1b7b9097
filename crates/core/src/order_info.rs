//! Order information consumed during intake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// What intake needs to know about an upstream order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_id: String,
    /// Minutes of preparation work.
    pub preparation_duration: i32,
}

/// Resolves an order/payment id to its [`OrderInfo`].
///
/// Implementations map every transport or protocol fault to
/// [`CoreError::Lookup`].
#[async_trait]
pub trait OrderInfoProvider: Send + Sync {
    async fn resolve(&self, order_id: &str) -> Result<OrderInfo, CoreError>;
}
