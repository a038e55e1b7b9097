//! Handlers for the `/preparations` resource.
//!
//! Every handler delegates to [`PreparationService`](preparation_core::service::PreparationService);
//! domain failures map to HTTP responses through [`AppError`](crate::error::AppError).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for [`intake`].
#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    /// Order (payment) id the preparation is created for.
    pub id: String,
}

/// POST /api/v1/preparations
///
/// Queue a preparation for an order at the tail of the RECEIVED queue.
/// Returns 409 when the id was already taken in.
pub async fn intake(
    State(state): State<AppState>,
    Json(input): Json<IntakeRequest>,
) -> AppResult<impl IntoResponse> {
    let preparation = state.service.intake(&input.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: preparation })))
}

/// POST /api/v1/preparations/start-next
///
/// Start the RECEIVED preparation with the lowest position.
pub async fn start_next(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let preparation = state.service.start_next().await?;
    Ok(Json(DataResponse { data: preparation }))
}

/// POST /api/v1/preparations/{id}/ready
pub async fn mark_ready(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let preparation = state.service.mark_ready(&id).await?;
    Ok(Json(DataResponse { data: preparation }))
}

/// POST /api/v1/preparations/{id}/complete
pub async fn mark_completed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let preparation = state.service.mark_completed(&id).await?;
    Ok(Json(DataResponse { data: preparation }))
}

/// GET /api/v1/preparations/waiting-list
///
/// READY first (oldest update first), then IN_PREPARATION (soonest estimate
/// first), then RECEIVED (by position).
pub async fn waiting_list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let preparations = state.service.waiting_list().await?;
    Ok(Json(DataResponse { data: preparations }))
}
