//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{ErrorClass, PlaceOrderError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// A lost race the client should simply retry.
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                // The caller gets a stable, generic message; detail stays
                // in the logs.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Order processing failed".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<PlaceOrderError> for ApiError {
    fn from(err: PlaceOrderError) -> Self {
        match err.class() {
            ErrorClass::InvalidRequest => {
                tracing::info!(error = %err, "invalid order request");
                ApiError::BadRequest(err.to_string())
            }
            ErrorClass::Conflict => {
                tracing::info!(error = %err, "order placement lost a race");
                ApiError::Conflict(err.to_string())
            }
            ErrorClass::Internal => ApiError::Internal(err.to_string()),
        }
    }
}
