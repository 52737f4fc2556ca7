use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookId, BookStatus, Page, PageRequest, ReceiptId, ReceiptStatus, UserId};
use inventory::PostgresBookStore;
use sqlx::error::ErrorKind;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::error::ReceiptStoreError;
use crate::receipt::{NewReceipt, Receipt};
use crate::store::{ReceiptStore, StoreResult, TransactionalPlacement};

const RECEIPT_COLUMNS: &str =
    "id, user_id, book_id, status, due_date, created_at, updated_at, deleted_at, idempotency_key";

/// PostgreSQL-backed receipt store.
///
/// Receipts share a database with the `books` table, so this store can also
/// perform a placement as one transaction.
#[derive(Clone)]
pub struct PostgresReceiptStore {
    pool: PgPool,
}

impl PostgresReceiptStore {
    /// Creates a new PostgreSQL receipt store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_on(conn: &mut PgConnection, receipt: &NewReceipt) -> StoreResult<Receipt> {
        let row = sqlx::query(&format!(
            "INSERT INTO receipts (user_id, book_id, status, due_date, created_at, updated_at, idempotency_key) \
             VALUES ($1, $2, $3, $4, $5, $5, $6) RETURNING {RECEIPT_COLUMNS}"
        ))
        .bind(receipt.user_id.as_i64())
        .bind(receipt.book_id.as_i64())
        .bind(ReceiptStatus::Pending.as_str())
        .bind(receipt.due_date)
        .bind(receipt.created_at)
        .bind(receipt.idempotency_key.as_deref())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_write_error(e, receipt.book_id, receipt.idempotency_key.as_deref()))?;

        Self::row_to_receipt(row)
    }

    fn row_to_receipt(row: PgRow) -> StoreResult<Receipt> {
        let status: String = row.try_get("status")?;
        Ok(Receipt {
            id: ReceiptId::from_i64(row.try_get("id")?),
            user_id: UserId::from_i64(row.try_get("user_id")?),
            book_id: BookId::from_i64(row.try_get("book_id")?),
            status: status.parse()?,
            due_date: row.try_get("due_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
            idempotency_key: row.try_get("idempotency_key")?,
        })
    }
}

/// Translates constraint violations into store errors.
fn map_write_error(e: sqlx::Error, book_id: BookId, key: Option<&str>) -> ReceiptStoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        match db_err.constraint() {
            Some("unique_receipt_idempotency_key") => {
                return ReceiptStoreError::DuplicateKey(key.unwrap_or_default().to_string());
            }
            Some("unique_active_receipt_per_book") => {
                return ReceiptStoreError::ActiveReceiptExists(book_id);
            }
            _ => {}
        }
        if db_err.kind() == ErrorKind::ForeignKeyViolation {
            return ReceiptStoreError::BookMissing(book_id);
        }
    }
    ReceiptStoreError::Database(e)
}

#[async_trait]
impl ReceiptStore for PostgresReceiptStore {
    async fn insert(&self, receipt: NewReceipt) -> StoreResult<Receipt> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_on(&mut conn, &receipt).await
    }

    async fn get(&self, id: ReceiptId) -> StoreResult<Option<Receipt>> {
        let row = sqlx::query(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_receipt).transpose()
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Receipt>> {
        let row = sqlx::query(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE idempotency_key = $1 AND deleted_at IS NULL"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_receipt).transpose()
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Receipt>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts \
             WHERE user_id = $1 AND deleted_at IS NULL ORDER BY id ASC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_receipt).collect()
    }

    async fn list(&self, page: PageRequest) -> StoreResult<Page<Receipt>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE deleted_at IS NULL \
             ORDER BY id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_receipt)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page {
            items,
            total: total as u64,
        })
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Receipt>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts \
             WHERE status = $1 AND created_at <= $2 AND deleted_at IS NULL ORDER BY id ASC"
        ))
        .bind(ReceiptStatus::Pending.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_receipt).collect()
    }

    async fn set_status(
        &self,
        id: ReceiptId,
        expected: ReceiptStatus,
        status: ReceiptStatus,
    ) -> StoreResult<Option<Receipt>> {
        let row = sqlx::query(&format!(
            "UPDATE receipts SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3 AND deleted_at IS NULL RETURNING {RECEIPT_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(status.as_str())
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(row) => row.map(Self::row_to_receipt).transpose(),
            Err(e) => {
                // Only the active-receipt index can reject a status write.
                let book_id: Option<i64> =
                    sqlx::query_scalar("SELECT book_id FROM receipts WHERE id = $1")
                        .bind(id.as_i64())
                        .fetch_optional(&self.pool)
                        .await?;
                Err(map_write_error(
                    e,
                    BookId::from_i64(book_id.unwrap_or_default()),
                    None,
                ))
            }
        }
    }

    async fn soft_delete(&self, id: ReceiptId) -> StoreResult<Option<Receipt>> {
        let row = sqlx::query(&format!(
            "UPDATE receipts SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {RECEIPT_COLUMNS}"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_receipt).transpose()
    }
}

#[async_trait]
impl TransactionalPlacement for PostgresReceiptStore {
    async fn insert_and_claim(&self, receipt: NewReceipt) -> StoreResult<Option<Receipt>> {
        let mut tx = self.pool.begin().await?;

        let inserted = Self::insert_on(&mut *tx, &receipt).await?;

        let claimed = PostgresBookStore::try_transition_on(
            &mut *tx,
            receipt.book_id,
            BookStatus::Available,
            BookStatus::Placed,
        )
        .await;

        match claimed {
            Ok(true) => {
                tx.commit().await?;
                Ok(Some(inserted))
            }
            Ok(false) => {
                tx.rollback().await?;
                Ok(None)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e.into())
            }
        }
    }
}
