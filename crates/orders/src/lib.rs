//! HTTP client for the order service.
//!
//! [`ApiOrderInfoProvider`] implements the
//! [`OrderInfoProvider`](preparation_core::order_info::OrderInfoProvider) port
//! by calling `GET {base_url}/order/{id}` and reading the `orderId` and
//! `preparationTime` fields of the response. Other fields are ignored.

pub mod client;
pub mod config;

pub use client::{ApiOrderInfoProvider, OrderApiError};
pub use config::OrderApiConfig;
