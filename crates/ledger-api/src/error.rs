//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ErrorBody;
use ledger::LedgerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Ledger operation error.
    Ledger(LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Ledger(err) => ledger_error_to_response(err),
        };

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, String) {
    let status = match &err {
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::ReceiptNotFound(_) | LedgerError::BookNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::CompensationFailed { .. }
        | LedgerError::Store(_)
        | LedgerError::Inventory(_) => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let message = match err {
        // Callers see the conflict reason, not the error prefix.
        LedgerError::Conflict(reason) => reason,
        other => other.to_string(),
    };
    (status, message)
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

#[cfg(test)]
mod tests {
    use common::{BookId, ReceiptId};
    use inventory::InventoryError;

    use super::*;

    fn status_of(err: LedgerError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_ledger_error_status_codes() {
        assert_eq!(
            status_of(LedgerError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(LedgerError::ReceiptNotFound(ReceiptId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LedgerError::BookNotFound(BookId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LedgerError::Conflict("book 1 not available".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LedgerError::Inventory(InventoryError::Unavailable(
                "down".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
