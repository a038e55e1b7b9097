//! Route definitions for the `/preparations` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::preparation;
use crate::state::AppState;

/// Routes mounted at `/preparations`.
///
/// ```text
/// POST   /                -> intake
/// POST   /start-next      -> start_next
/// GET    /waiting-list    -> waiting_list
/// POST   /{id}/ready      -> mark_ready
/// POST   /{id}/complete   -> mark_completed
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(preparation::intake))
        .route("/start-next", post(preparation::start_next))
        .route("/waiting-list", get(preparation::waiting_list))
        .route("/{id}/ready", post(preparation::mark_ready))
        .route("/{id}/complete", post(preparation::mark_completed))
}
