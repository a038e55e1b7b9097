#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use preparation_core::memory::{FixedOrderInfoProvider, InMemoryPreparationStore};
use preparation_core::service::PreparationService;
use preparation_core::store::PreparationStore;
use serde_json::Value;
use tower::ServiceExt;

use preparation_api::config::ServerConfig;
use preparation_api::router::build_app_router;
use preparation_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_max_connections: 1,
    }
}

/// Orders known to the test order service: `A` takes 10 minutes, `B` 5,
/// `C` 7.
pub fn test_orders() -> FixedOrderInfoProvider {
    FixedOrderInfoProvider::new()
        .with_order("A", 10)
        .with_order("B", 5)
        .with_order("C", 7)
}

/// Build the full application router over the given store and the
/// [`test_orders`] lookup, with the same middleware stack `main.rs` uses.
pub fn build_test_app_with_store(store: Arc<dyn PreparationStore>) -> Router {
    let config = test_config();
    let service = PreparationService::new(store, Arc::new(test_orders()));

    let state = AppState {
        service: Arc::new(service),
    };

    build_app_router(state, &config)
}

/// Build the application over a fresh in-memory store.
pub fn build_test_app() -> Router {
    build_test_app_with_store(Arc::new(InMemoryPreparationStore::new()))
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Send a GET request through a clone of `app`.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a body-less POST request through a clone of `app`.
pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body through a clone of `app`.
pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// POST /api/v1/preparations for `id`.
pub async fn intake(app: &Router, id: &str) -> Response<Body> {
    post_json(app, "/api/v1/preparations", serde_json::json!({ "id": id })).await
}
