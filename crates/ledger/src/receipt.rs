//! Receipt entity.

use chrono::{DateTime, Duration, Utc};
use common::{Book, BookId, ReceiptId, ReceiptStatus, ReceiptView, UserId};

/// Default loan period used for `due_date`.
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

/// Maximum accepted idempotency key length.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// A loan record linking a user to a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: ReceiptId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub status: ReceiptStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
}

impl Receipt {
    /// Returns true if the receipt has not been soft-deleted.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Projects the receipt onto the wire type, embedding its book if known.
    pub fn into_view(self, book: Option<Book>) -> ReceiptView {
        ReceiptView {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            book,
            status: self.status,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// A receipt about to be inserted. Always starts `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReceipt {
    pub user_id: UserId,
    pub book_id: BookId,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub idempotency_key: Option<String>,
}

impl NewReceipt {
    pub fn pending(cmd: &PlaceReceipt, now: DateTime<Utc>, loan_period: Duration) -> Self {
        Self {
            user_id: cmd.user_id,
            book_id: cmd.book_id,
            created_at: now,
            due_date: now + loan_period,
            idempotency_key: cmd.idempotency_key.clone(),
        }
    }
}

/// Request to place a book for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceReceipt {
    pub user_id: UserId,
    pub book_id: BookId,
    /// Caller token making retries safe.
    pub idempotency_key: Option<String>,
}

impl PlaceReceipt {
    pub fn new(user_id: UserId, book_id: BookId) -> Self {
        Self {
            user_id,
            book_id,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Rejects empty or oversized idempotency keys.
    pub fn validate(&self) -> Result<(), String> {
        match self.idempotency_key.as_deref() {
            Some(key) if key.trim().is_empty() => {
                Err("idempotency key must not be blank".to_string())
            }
            Some(key) if key.len() > MAX_IDEMPOTENCY_KEY_LEN => Err(format!(
                "idempotency key longer than {MAX_IDEMPOTENCY_KEY_LEN} bytes"
            )),
            _ => Ok(()),
        }
    }

    /// Returns true if `receipt` was created by an identical request.
    pub fn matches(&self, receipt: &Receipt) -> bool {
        receipt.user_id == self.user_id && receipt.book_id == self.book_id
    }
}
