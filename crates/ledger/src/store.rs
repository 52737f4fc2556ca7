use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Page, PageRequest, ReceiptId, ReceiptStatus, UserId};

use crate::error::ReceiptStoreError;
use crate::receipt::{NewReceipt, Receipt};

/// Result type for receipt store operations.
pub type StoreResult<T> = std::result::Result<T, ReceiptStoreError>;

/// Core trait for receipt storage.
///
/// Soft-deleted receipts are invisible to every read.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Inserts a `pending` receipt and assigns its id.
    ///
    /// Fails with `DuplicateKey` if a live receipt already carries the same
    /// idempotency key.
    async fn insert(&self, receipt: NewReceipt) -> StoreResult<Receipt>;

    /// Loads a live receipt.
    async fn get(&self, id: ReceiptId) -> StoreResult<Option<Receipt>>;

    /// Finds the live receipt created with an idempotency key.
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Receipt>>;

    /// Lists a user's live receipts, ordered by id.
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Receipt>>;

    /// Lists one page of live receipts, ordered by id.
    async fn list(&self, page: PageRequest) -> StoreResult<Page<Receipt>>;

    /// Lists live `pending` receipts created at or before `cutoff`.
    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Receipt>>;

    /// Moves a live receipt from `expected` to `status`.
    ///
    /// Returns `None`, writing nothing, if the receipt is absent or its
    /// current status is not `expected`.
    async fn set_status(
        &self,
        id: ReceiptId,
        expected: ReceiptStatus,
        status: ReceiptStatus,
    ) -> StoreResult<Option<Receipt>>;

    /// Marks a receipt deleted and returns it, or `None` if it was absent or
    /// already deleted.
    async fn soft_delete(&self, id: ReceiptId) -> StoreResult<Option<Receipt>>;
}

/// Storage able to insert a receipt and claim its book in one transaction.
///
/// Available when receipts and books live in the same database; it removes
/// the window in which a provisional receipt exists without its book.
#[async_trait]
pub trait TransactionalPlacement: Send + Sync {
    /// Inserts the receipt and moves its book `available → placed` atomically.
    ///
    /// Returns `None`, with nothing persisted, if the book was not available.
    async fn insert_and_claim(&self, receipt: NewReceipt) -> StoreResult<Option<Receipt>>;
}
