//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::BookingError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Saga execution error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::RoomUnavailable { .. } | SagaError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        SagaError::InventoryUnreachable { .. } => StatusCode::BAD_GATEWAY,
        SagaError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SagaError::BookingNotFound(_) => StatusCode::NOT_FOUND,
        SagaError::StorageConflict { .. }
        | SagaError::IllegalTransition { .. }
        | SagaError::StaleCutoffOutOfRange { .. }
        | SagaError::Store(_) => {
            tracing::error!(error = %err, "booking saga failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
