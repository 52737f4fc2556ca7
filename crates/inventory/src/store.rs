use async_trait::async_trait;
use common::{Book, BookId, BookStatus, CategoryId, Page, PageRequest};
use serde::Deserialize;

use crate::{InventoryError, Result};

/// Descriptive fields of a book.
///
/// Used both to add a book, which always starts available, and to edit one.
/// It carries no status: availability only changes through the loan protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub location: String,
}

impl NewBook {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        category_id: CategoryId,
        location: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            category_id,
            location: location.into(),
        }
    }

    /// Rejects books without a title or author.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(InventoryError::Validation("title is required".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(InventoryError::Validation("author is required".to_string()));
        }
        Ok(())
    }
}

/// Core trait for book storage.
///
/// `try_transition` is the only concurrency-control primitive in the system:
/// implementations must apply it as one atomic conditional update, never as a
/// read followed by a write.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Adds a book with status `available`.
    async fn insert(&self, book: NewBook) -> Result<Book>;

    /// Loads a book by id.
    async fn get(&self, id: BookId) -> Result<Option<Book>>;

    /// Lists every book in a category, ordered by id.
    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Book>>;

    /// Lists one page of books, ordered by id.
    async fn list(&self, page: PageRequest) -> Result<Page<Book>>;

    /// Moves the book from `from` to `to` only if its current status is `from`.
    ///
    /// Returns `Ok(false)` when the status did not match and nothing changed.
    /// Fails with `IllegalTransition` if `from → to` is not a legal edge and
    /// with `BookNotFound` if the book does not exist.
    async fn try_transition(&self, id: BookId, from: BookStatus, to: BookStatus) -> Result<bool>;

    /// Replaces a book's descriptive fields, keeping its status.
    ///
    /// Fails with `BookNotFound` if the book does not exist.
    async fn update(&self, id: BookId, details: NewBook) -> Result<Book>;

    /// Deletes the book only if it is `available`.
    ///
    /// Returns `Ok(false)` when the book is placed or taken and nothing
    /// changed. Fails with `BookNotFound` if the book does not exist.
    async fn try_delete(&self, id: BookId) -> Result<bool>;

    /// Sets the status regardless of its current value.
    ///
    /// Used when a receipt status update dictates the book state, e.g. a
    /// return must free the book whatever flag it currently carries.
    async fn force_status(&self, id: BookId, to: BookStatus) -> Result<Book>;
}

/// Rejects transitions that are not edges of the availability state machine.
pub fn check_transition(from: BookStatus, to: BookStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(InventoryError::IllegalTransition { from, to })
    }
}
