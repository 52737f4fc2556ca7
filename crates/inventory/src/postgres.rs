use async_trait::async_trait;
use common::{Book, BookId, BookStatus, CategoryId, Page, PageRequest};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    InventoryError, Result,
    store::{BookStore, NewBook, check_transition},
};

const BOOK_COLUMNS: &str = "id, title, author, category_id, location, status";

/// PostgreSQL-backed book store.
#[derive(Clone)]
pub struct PostgresBookStore {
    pool: PgPool,
}

impl PostgresBookStore {
    /// Creates a new PostgreSQL book store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Compare-and-swap on an existing connection, so callers can include the
    /// book transition in a wider transaction.
    pub async fn try_transition_on(
        conn: &mut PgConnection,
        id: BookId,
        from: BookStatus,
        to: BookStatus,
    ) -> Result<bool> {
        check_transition(from, to)?;

        let updated = sqlx::query(
            "UPDATE books SET status = $3 WHERE id = $1 AND status = $2 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(true);
        }

        // Zero rows: either the status differed or the book is missing.
        if Self::exists_on(conn, id).await? {
            tracing::debug!(book_id = %id, %from, %to, "conditional transition lost");
            Ok(false)
        } else {
            Err(InventoryError::BookNotFound(id))
        }
    }

    async fn exists_on(conn: &mut PgConnection, id: BookId) -> Result<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id.as_i64())
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    fn row_to_book(row: PgRow) -> Result<Book> {
        let status: String = row.try_get("status")?;
        Ok(Book {
            id: BookId::from_i64(row.try_get("id")?),
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            category_id: CategoryId::from_i64(row.try_get("category_id")?),
            location: row.try_get("location")?,
            status: status.parse()?,
        })
    }
}

#[async_trait]
impl BookStore for PostgresBookStore {
    async fn insert(&self, book: NewBook) -> Result<Book> {
        book.validate()?;

        let row = sqlx::query(&format!(
            "INSERT INTO books (title, author, category_id, location, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.category_id.as_i64())
        .bind(&book.location)
        .bind(BookStatus::Available.as_str())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_book(row)
    }

    async fn get(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_book).transpose()
    }

    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE category_id = $1 AND deleted_at IS NULL ORDER BY id ASC"
        ))
        .bind(category_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_book).collect()
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Book>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE deleted_at IS NULL \
             ORDER BY id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_book)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            total: total as u64,
        })
    }

    async fn try_transition(&self, id: BookId, from: BookStatus, to: BookStatus) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::try_transition_on(&mut conn, id, from, to).await
    }

    async fn update(&self, id: BookId, details: NewBook) -> Result<Book> {
        details.validate()?;

        let row = sqlx::query(&format!(
            "UPDATE books SET title = $2, author = $3, category_id = $4, location = $5 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(&details.title)
        .bind(&details.author)
        .bind(details.category_id.as_i64())
        .bind(&details.location)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(InventoryError::BookNotFound(id))?;

        Self::row_to_book(row)
    }

    /// Soft-deletes, so receipts keep a valid reference for their history.
    async fn try_delete(&self, id: BookId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let deleted = sqlx::query(
            "UPDATE books SET deleted_at = NOW() \
             WHERE id = $1 AND status = $2 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .bind(BookStatus::Available.as_str())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if deleted == 1 {
            return Ok(true);
        }
        if Self::exists_on(&mut conn, id).await? {
            Ok(false)
        } else {
            Err(InventoryError::BookNotFound(id))
        }
    }

    async fn force_status(&self, id: BookId, to: BookStatus) -> Result<Book> {
        let row = sqlx::query(&format!(
            "UPDATE books SET status = $2 WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(InventoryError::BookNotFound(id))?;

        tracing::debug!(book_id = %id, status = %to, "book status forced");
        Self::row_to_book(row)
    }
}
