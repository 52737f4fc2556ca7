use common::{BookId, BookStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the book inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The book does not exist.
    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// The requested transition is not an edge of the availability state machine.
    #[error("Illegal book transition: {from} -> {to}")]
    IllegalTransition { from: BookStatus, to: BookStatus },

    /// A book failed validation before being stored.
    #[error("Invalid book: {0}")]
    Validation(String),

    /// Injected or otherwise unexplained storage failure.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored status value could not be parsed.
    #[error("Corrupt status column: {0}")]
    CorruptStatus(#[from] common::ParseStatusError),
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
