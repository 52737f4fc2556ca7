//! Authenticated receipt endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::{IDEMPOTENCY_KEY_HEADER, MessageBody, ReceiptId};
use receipt_client::ReceiptGateway;

use crate::AppState;
use crate::auth::AuthUser;
use crate::coordinator::{Placement, PlacementRequest};
use crate::error::ApiError;

/// POST /receipts: place a book for the caller.
///
/// `201` for a new receipt, `200` when an `Idempotency-Key` retry got back
/// the receipt created earlier.
#[tracing::instrument(skip(state, headers))]
pub async fn place<G: ReceiptGateway + 'static>(
    State(state): State<Arc<AppState<G>>>,
    AuthUser(actor): AuthUser,
    headers: HeaderMap,
    Json(request): Json<PlacementRequest>,
) -> Result<(StatusCode, Json<Placement>), ApiError> {
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|v| v.to_str())
        .transpose()
        .map_err(|_| ApiError::BadRequest("Idempotency-Key must be ASCII".to_string()))?;

    let placed = state.coordinator.place(actor, request, key).await?;
    let status = if placed.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(placed.placement)))
}

/// POST /receipts/{id}/cancel: cancel one of the caller's receipts.
#[tracing::instrument(skip(state))]
pub async fn cancel<G: ReceiptGateway + 'static>(
    State(state): State<Arc<AppState<G>>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<ReceiptId>,
) -> Result<Json<MessageBody>, ApiError> {
    state.coordinator.cancel(actor, id).await?;
    Ok(Json(MessageBody {
        message: format!("Receipt {id} canceled"),
    }))
}

/// GET /receipts: the caller's receipts.
#[tracing::instrument(skip(state))]
pub async fn mine<G: ReceiptGateway + 'static>(
    State(state): State<Arc<AppState<G>>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<Placement>>, ApiError> {
    Ok(Json(state.coordinator.my_receipts(actor).await?))
}
