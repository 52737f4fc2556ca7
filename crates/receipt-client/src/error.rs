//! Client error types.

use thiserror::Error;

/// Errors returned by calls to the receipt ledger.
#[derive(Debug, Error)]
pub enum ReceiptClientError {
    /// The ledger refused the change: the book is taken or the receipt is closed.
    #[error("{0}")]
    Conflict(String),

    /// The ledger answered with a non-success status.
    #[error("ledger responded {status}: {message}")]
    Remote { status: u16, message: String },

    /// The request did not complete (connect failure, timeout, reset).
    #[error("ledger request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not what the ledger contract promises.
    #[error("undecodable ledger response: {0}")]
    Decode(String),
}

impl ReceiptClientError {
    /// HTTP status reported by the ledger, if it answered at all.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            ReceiptClientError::Conflict(_) => Some(409),
            ReceiptClientError::Remote { status, .. } => Some(*status),
            ReceiptClientError::Transport(_) | ReceiptClientError::Decode(_) => None,
        }
    }
}

/// Convenience type alias for client results.
pub type Result<T> = std::result::Result<T, ReceiptClientError>;
