use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cadence_scheduler::SchedulerError;
use serde_json::json;
use tracing::error;

/// Error type returned by every task handler.
#[derive(Debug)]
pub enum ApiError {
    Scheduler(SchedulerError),
    /// The request body could not be decoded into a task definition.
    InvalidBody(String),
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        ApiError::Scheduler(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidBody(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Scheduler(SchedulerError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "message": "validation failed",
                    "code": "VALIDATION_FAILED",
                    "validation_errors": errors,
                })),
            )
                .into_response(),
            ApiError::Scheduler(e) if e.is_invalid_request() => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": e.to_string(), "code": e.code() })),
            )
                .into_response(),
            ApiError::Scheduler(e) => {
                error!(code = e.code(), "internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}
