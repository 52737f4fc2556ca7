//! Book inventory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Book, BookId, CategoryId};
use inventory::{BookStore, NewBook};
use ledger::ReceiptStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::receipts::PageParams;

#[derive(Debug, Serialize, Deserialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: u64,
    pub pages: u64,
}

/// POST /books: add a book to the inventory.
#[tracing::instrument(skip(state, book))]
pub async fn create<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Json(book): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state.ledger.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /books: list books one page at a time.
#[tracing::instrument(skip(state))]
pub async fn list<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<BookPage>, ApiError> {
    let request = params.into_request()?;
    let page = state.ledger.list_books(request).await?;

    Ok(Json(BookPage {
        pages: request.page_count(page.total),
        total: page.total,
        books: page.items,
    }))
}

/// GET /books/{id}
#[tracing::instrument(skip(state))]
pub async fn get<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.ledger.get_book(id).await?))
}

/// PUT /books/{id}: edit title, author, category and location.
///
/// Any `status` in the body is ignored; availability belongs to receipts.
#[tracing::instrument(skip(state, details))]
pub async fn update<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<BookId>,
    Json(details): Json<NewBook>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.ledger.update_book(id, details).await?))
}

/// DELETE /books/{id}: 409 while the book is placed or taken.
#[tracing::instrument(skip(state))]
pub async fn delete<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, ApiError> {
    state.ledger.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /books/category/{category_id}
#[tracing::instrument(skip(state))]
pub async fn by_category<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.ledger.books_in_category(category_id).await?))
}
