//! Ledger error types.

use common::{BookId, ReceiptId};
use inventory::InventoryError;
use thiserror::Error;

/// Errors raised by receipt storage.
#[derive(Debug, Error)]
pub enum ReceiptStoreError {
    /// A live receipt already carries this idempotency key.
    #[error("Duplicate idempotency key: {0}")]
    DuplicateKey(String),

    /// Another pending or owned receipt already references the book.
    #[error("Book {0} already has an active receipt")]
    ActiveReceiptExists(BookId),

    /// The referenced book does not exist.
    #[error("Referenced book {0} does not exist")]
    BookMissing(BookId),

    /// Injected or otherwise unexplained storage failure.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The book side of a transactional placement failed.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored status value could not be parsed.
    #[error("Corrupt status column: {0}")]
    CorruptStatus(#[from] common::ParseStatusError),
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The request was malformed.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Receipt not found (or soft-deleted).
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(ReceiptId),

    /// Book not found.
    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// The book cannot be placed right now.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Undoing a provisional receipt failed; the receipt may be orphaned.
    #[error("Compensation for receipt {receipt_id} failed: {reason}")]
    CompensationFailed {
        receipt_id: ReceiptId,
        reason: String,
    },

    /// Receipt storage error.
    #[error("Receipt store error: {0}")]
    Store(ReceiptStoreError),

    /// Book storage error.
    #[error("Inventory error: {0}")]
    Inventory(InventoryError),
}

impl LedgerError {
    /// Returns true for storage faults, as opposed to caller mistakes.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            LedgerError::CompensationFailed { .. }
                | LedgerError::Store(_)
                | LedgerError::Inventory(_)
        )
    }
}

impl From<ReceiptStoreError> for LedgerError {
    fn from(e: ReceiptStoreError) -> Self {
        match e {
            ReceiptStoreError::ActiveReceiptExists(book_id) => {
                LedgerError::Conflict(format!("book {book_id} not available"))
            }
            ReceiptStoreError::BookMissing(book_id) => LedgerError::BookNotFound(book_id),
            ReceiptStoreError::Inventory(e) => e.into(),
            other => LedgerError::Store(other),
        }
    }
}

impl From<InventoryError> for LedgerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::BookNotFound(book_id) => LedgerError::BookNotFound(book_id),
            InventoryError::Validation(msg) => LedgerError::Validation(msg),
            other => LedgerError::Inventory(other),
        }
    }
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;
