//! JSON contract between the ledger service and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{BookStatus, ReceiptStatus};
use crate::types::{BookId, CategoryId, ReceiptId, UserId};

/// Header carrying the caller's idempotency token on `POST /receipts`.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// A book as stored by the inventory and embedded in receipt responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category_id: CategoryId,
    /// Shelf code.
    pub location: String,
    pub status: BookStatus,
}

/// A receipt as returned by the ledger, with its book resolved when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptView {
    pub id: ReceiptId,
    pub user_id: UserId,
    pub book_id: BookId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
    pub status: ReceiptStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Body of `POST /receipts` on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceReceiptBody {
    pub user_id: UserId,
    pub book_id: BookId,
}

/// Body of `GET /receipts` on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptPage {
    pub receipts: Vec<ReceiptView>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Error body shared by both services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
