use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use preparation_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `preparation_core`.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a domain error into an HTTP status, error code, and message.
///
/// Client-input failures carry their message through. Storage and order
/// lookup failures are logged here and answered with a sanitized message.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InvalidTransition { .. } => (
            StatusCode::BAD_REQUEST,
            "INVALID_TRANSITION",
            err.to_string(),
        ),
        CoreError::QueueEmpty => (StatusCode::BAD_REQUEST, "QUEUE_EMPTY", err.to_string()),
        CoreError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS", err.to_string()),
        CoreError::PositionConflict(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "POSITION_CONFLICT",
            "The queue is busy, retry the request".to_string(),
        ),
        CoreError::Lookup(msg) => {
            tracing::error!(error = %msg, "Order lookup error");
            (
                StatusCode::BAD_GATEWAY,
                "LOOKUP_FAILED",
                "Order information is unavailable".to_string(),
            )
        }
        CoreError::Persistence(msg) => {
            tracing::error!(error = %msg, "Persistence error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
