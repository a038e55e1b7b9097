use async_trait::async_trait;
use preparation_core::error::CoreError;
use preparation_core::order_info::{OrderInfo, OrderInfoProvider};
use reqwest::Url;
use serde::Deserialize;

use crate::config::OrderApiConfig;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for order service lookups.
#[derive(Debug, thiserror::Error)]
pub enum OrderApiError {
    /// The configured base URL cannot carry a `/order/{id}` path.
    #[error("Invalid order API base URL: {0}")]
    BaseUrl(String),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The order service returned a non-2xx status code.
    #[error("Order API returned HTTP {0}")]
    HttpStatus(u16),

    /// The response body was not the expected JSON shape.
    #[error("Unexpected order API response: {0}")]
    Body(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ApiOrderInfoProvider
// ---------------------------------------------------------------------------

/// Fields read from `GET /order/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: String,
    preparation_time: i32,
}

/// Looks up order information over HTTP.
#[derive(Debug)]
pub struct ApiOrderInfoProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiOrderInfoProvider {
    /// Build a provider with its own pooled HTTP client.
    pub fn new(config: &OrderApiConfig) -> Result<Self, OrderApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| OrderApiError::BaseUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(OrderApiError::BaseUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// `{base_url}/order/{order_id}`, with the id percent-encoded as one
    /// path segment.
    fn order_url(&self, order_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("order").push(order_id);
        }
        url
    }

    /// Fetch the order and keep only what intake needs.
    pub async fn fetch(&self, order_id: &str) -> Result<OrderInfo, OrderApiError> {
        let url = self.order_url(order_id);
        let response = self.client.get(url.clone()).send().await?;
        tracing::debug!(%url, status = response.status().as_u16(), "Order API response");

        if !response.status().is_success() {
            return Err(OrderApiError::HttpStatus(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let order: OrderResponse = serde_json::from_slice(&body)?;
        Ok(OrderInfo {
            order_id: order.order_id,
            preparation_duration: order.preparation_time,
        })
    }
}

#[async_trait]
impl OrderInfoProvider for ApiOrderInfoProvider {
    async fn resolve(&self, order_id: &str) -> Result<OrderInfo, CoreError> {
        self.fetch(order_id).await.map_err(|e| {
            tracing::error!(order_id, error = %e, "Order lookup failed");
            CoreError::Lookup(e.to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
