//! Placement coordinator: the user-facing side of the loan protocol.
//!
//! Holds no state of its own. Every decision about availability is made by
//! the ledger; this layer checks who is asking and translates the answer.

use chrono::{DateTime, Utc};
use common::{BookId, ReceiptId, ReceiptStatus, ReceiptView, UserId};
use receipt_client::{PlacedReceipt, ReceiptClientError, ReceiptGateway};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to callers of the placement service.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The caller tried to act for another user.
    #[error("{0}")]
    Forbidden(String),

    /// The receipt does not exist or is not the caller's.
    #[error("{0}")]
    NotFound(String),

    /// The book is already placed or taken.
    #[error("{0}")]
    BookUnavailable(String),

    /// The receipt is already returned or canceled.
    #[error("{0}")]
    ReceiptClosed(String),

    /// The ledger failed or could not be reached.
    #[error("ledger error: {0}")]
    Upstream(String),
}

impl From<ReceiptClientError> for PlacementError {
    fn from(err: ReceiptClientError) -> Self {
        match err {
            ReceiptClientError::Conflict(message) => PlacementError::BookUnavailable(message),
            ReceiptClientError::Remote {
                status: 404,
                message,
            } => PlacementError::NotFound(message),
            other => PlacementError::Upstream(other.to_string()),
        }
    }
}

/// Convenience type alias for coordinator results.
pub type Result<T> = std::result::Result<T, PlacementError>;

/// Body of `POST /receipts` on the placement service.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlacementRequest {
    /// Defaults to the caller.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub book_id: BookId,
}

/// A receipt as the placement service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub receipt_id: ReceiptId,
    pub book_id: BookId,
    pub status: ReceiptStatus,
    pub due_date: DateTime<Utc>,
}

/// Outcome of [`PlacementCoordinator::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placed {
    pub placement: Placement,
    /// The ledger returned the receipt from an earlier request with the same
    /// idempotency key.
    pub replayed: bool,
}

impl From<PlacedReceipt> for Placed {
    fn from(placed: PlacedReceipt) -> Self {
        Self {
            placement: placed.receipt.into(),
            replayed: placed.replayed,
        }
    }
}

impl From<ReceiptView> for Placement {
    fn from(view: ReceiptView) -> Self {
        Self {
            receipt_id: view.id,
            book_id: view.book_id,
            status: view.status,
            due_date: view.due_date,
        }
    }
}

pub struct PlacementCoordinator<G: ReceiptGateway> {
    gateway: G,
}

impl<G: ReceiptGateway> PlacementCoordinator<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    #[cfg(test)]
    fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Places a book for the caller. One ledger call, no retries.
    #[tracing::instrument(skip(self))]
    pub async fn place(
        &self,
        actor: UserId,
        request: PlacementRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Placed> {
        let user_id = request.user_id.unwrap_or(actor);
        if user_id != actor {
            tracing::warn!(%actor, %user_id, "placement for another user refused");
            return Err(PlacementError::Forbidden(
                "cannot place a book for another user".to_string(),
            ));
        }

        let result = self
            .gateway
            .place(user_id, request.book_id, idempotency_key)
            .await
            .map_err(PlacementError::from);

        let outcome = match &result {
            Ok(placed) if placed.replayed => "replayed",
            Ok(_) => "placed",
            Err(PlacementError::BookUnavailable(_)) => "unavailable",
            Err(_) => "failed",
        };
        metrics::counter!("placements_total", "outcome" => outcome).increment(1);

        let placed = result?;
        tracing::info!(
            receipt_id = %placed.receipt.id,
            replayed = placed.replayed,
            "book placed"
        );
        Ok(placed.into())
    }

    /// Cancels one of the caller's active receipts.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, actor: UserId, receipt_id: ReceiptId) -> Result<()> {
        let status = self
            .gateway
            .list_for_user(actor)
            .await?
            .into_iter()
            .find(|r| r.id == receipt_id)
            .map(|r| r.status)
            .ok_or_else(|| PlacementError::NotFound(format!("receipt {receipt_id} not found")))?;

        if !status.is_active() {
            return Err(closed(receipt_id, status));
        }

        // The ledger re-checks; it answers 409 if the receipt closed meanwhile.
        self.gateway
            .cancel(receipt_id)
            .await
            .map_err(|e| match e {
                ReceiptClientError::Conflict(message) => PlacementError::ReceiptClosed(message),
                other => other.into(),
            })?;
        tracing::info!(%receipt_id, "receipt canceled");
        Ok(())
    }

    /// Lists the caller's receipts.
    #[tracing::instrument(skip(self))]
    pub async fn my_receipts(&self, actor: UserId) -> Result<Vec<Placement>> {
        let receipts = self.gateway.list_for_user(actor).await?;
        Ok(receipts.into_iter().map(Placement::from).collect())
    }
}

fn closed(receipt_id: ReceiptId, status: ReceiptStatus) -> PlacementError {
    PlacementError::ReceiptClosed(format!(
        "receipt {receipt_id} is {status} and cannot be canceled"
    ))
}
