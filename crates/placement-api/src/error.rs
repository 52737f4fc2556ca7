//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ErrorBody;

use crate::coordinator::PlacementError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Placement error.
    Placement(PlacementError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Placement(err) => placement_error_to_response(err),
        };

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}

fn placement_error_to_response(err: PlacementError) -> (StatusCode, String) {
    match &err {
        PlacementError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
        PlacementError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        PlacementError::BookUnavailable(_) | PlacementError::ReceiptClosed(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        PlacementError::Upstream(_) => {
            tracing::error!(error = %err, "ledger call failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        ApiError::Placement(err)
    }
}
