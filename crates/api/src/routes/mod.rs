pub mod health;
pub mod preparation;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /preparations                   intake (POST)
/// /preparations/start-next        start the head of the queue (POST)
/// /preparations/waiting-list      display board view (GET)
/// /preparations/{id}/ready        mark ready (POST)
/// /preparations/{id}/complete     mark completed (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/preparations", preparation::router())
}
