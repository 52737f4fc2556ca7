//! Receipt endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use common::{
    IDEMPOTENCY_KEY_HEADER, MessageBody, PageRequest, PlaceReceiptBody, ReceiptId, ReceiptPage,
    ReceiptStatus, ReceiptView, UserId,
};
use inventory::BookStore;
use ledger::{CreateOutcome, PlaceReceipt, ReceiptStore};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

/// Query parameters for paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    /// Applies defaults and rejects zero values.
    pub fn into_request(self) -> Result<PageRequest, ApiError> {
        PageRequest::new(
            self.page.unwrap_or(PageRequest::DEFAULT_PAGE),
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        )
        .ok_or_else(|| ApiError::BadRequest("page and page_size must be positive".to_string()))
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| ApiError::BadRequest("Idempotency-Key must be ASCII".to_string()))
        })
        .transpose()
}

/// POST /receipts: place a book for a user.
///
/// `201` for a new receipt, `200` when an idempotency key replays an earlier one.
#[tracing::instrument(skip(state, headers))]
pub async fn create<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    headers: HeaderMap,
    Json(body): Json<PlaceReceiptBody>,
) -> Result<(StatusCode, Json<ReceiptView>), ApiError> {
    let mut cmd = PlaceReceipt::new(body.user_id, body.book_id);
    if let Some(key) = idempotency_key(&headers)? {
        cmd = cmd.with_idempotency_key(key);
    }

    match state.ledger.create_receipt(cmd).await? {
        CreateOutcome::Created(receipt) => Ok((StatusCode::CREATED, Json(receipt))),
        CreateOutcome::Replayed(receipt) => Ok((StatusCode::OK, Json(receipt))),
    }
}

/// GET /receipts/{id}: load a receipt with its book.
#[tracing::instrument(skip(state))]
pub async fn get<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<ReceiptId>,
) -> Result<Json<ReceiptView>, ApiError> {
    Ok(Json(state.ledger.get_receipt(id).await?))
}

/// GET /receipts/user/{user_id}: list a user's receipts.
#[tracing::instrument(skip(state))]
pub async fn for_user<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<ReceiptView>>, ApiError> {
    Ok(Json(state.ledger.receipts_for_user(user_id).await?))
}

/// GET /receipts: list receipts one page at a time.
#[tracing::instrument(skip(state))]
pub async fn list<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<ReceiptPage>, ApiError> {
    let request = params.into_request()?;
    let page = state.ledger.list_receipts(request).await?;

    Ok(Json(ReceiptPage {
        receipts: page.items,
        total_count: page.total,
        page: request.page,
        page_size: request.page_size,
    }))
}

/// PATCH /receipts/{id}/status: body is a bare status string.
#[tracing::instrument(skip(state))]
pub async fn update_status<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<ReceiptId>,
    Json(status): Json<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let status: ReceiptStatus = status
        .parse()
        .map_err(|e: common::ParseStatusError| ApiError::BadRequest(e.to_string()))?;

    state.ledger.update_receipt_status(id, status).await?;

    Ok(Json(MessageBody {
        message: format!("Receipt {id} status updated to {status}"),
    }))
}

/// DELETE /receipts/{id}: soft-delete a receipt.
#[tracing::instrument(skip(state))]
pub async fn delete<R: ReceiptStore + 'static, B: BookStore + 'static>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<ReceiptId>,
) -> Result<Json<MessageBody>, ApiError> {
    state.ledger.delete_receipt(id).await?;

    Ok(Json(MessageBody {
        message: format!("Receipt {id} deleted"),
    }))
}
