use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Page, PageRequest, ReceiptId, ReceiptStatus, UserId};
use tokio::sync::RwLock;

use crate::error::ReceiptStoreError;
use crate::receipt::{NewReceipt, Receipt};
use crate::store::{ReceiptStore, StoreResult};

#[derive(Debug, Default)]
struct InMemoryReceiptState {
    receipts: BTreeMap<ReceiptId, Receipt>,
    next_id: u64,
}

impl InMemoryReceiptState {
    fn live(&self) -> impl Iterator<Item = &Receipt> {
        self.receipts.values().filter(|r| r.is_live())
    }
}

/// In-memory receipt store for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReceiptStore {
    state: Arc<RwLock<InMemoryReceiptState>>,
    fail_on_delete: Arc<AtomicBool>,
}

impl InMemoryReceiptStore {
    /// Creates a new empty in-memory receipt store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `soft_delete` fail with a storage error.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.fail_on_delete.store(fail, Ordering::SeqCst);
    }

    /// Total rows, including soft-deleted ones.
    pub async fn row_count(&self) -> usize {
        self.state.read().await.receipts.len()
    }

    /// Number of live receipts.
    pub async fn live_count(&self) -> usize {
        self.state.read().await.live().count()
    }

    /// Loads a receipt whether or not it has been deleted.
    pub async fn get_including_deleted(&self, id: ReceiptId) -> Option<Receipt> {
        self.state.read().await.receipts.get(&id).cloned()
    }
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn insert(&self, receipt: NewReceipt) -> StoreResult<Receipt> {
        let mut state = self.state.write().await;

        if let Some(key) = receipt.idempotency_key.as_deref()
            && state
                .live()
                .any(|r| r.idempotency_key.as_deref() == Some(key))
        {
            return Err(ReceiptStoreError::DuplicateKey(key.to_string()));
        }

        state.next_id += 1;
        let id = ReceiptId::new(state.next_id);
        let receipt = Receipt {
            id,
            user_id: receipt.user_id,
            book_id: receipt.book_id,
            status: ReceiptStatus::Pending,
            due_date: receipt.due_date,
            created_at: receipt.created_at,
            updated_at: receipt.created_at,
            deleted_at: None,
            idempotency_key: receipt.idempotency_key,
        };
        state.receipts.insert(id, receipt.clone());
        Ok(receipt)
    }

    async fn get(&self, id: ReceiptId) -> StoreResult<Option<Receipt>> {
        let state = self.state.read().await;
        Ok(state.receipts.get(&id).filter(|r| r.is_live()).cloned())
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Receipt>> {
        let state = self.state.read().await;
        Ok(state
            .live()
            .find(|r| r.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Receipt>> {
        let state = self.state.read().await;
        Ok(state
            .live()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list(&self, page: PageRequest) -> StoreResult<Page<Receipt>> {
        let state = self.state.read().await;
        Ok(Page::from_sorted(state.live().cloned().collect(), page))
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Receipt>> {
        let state = self.state.read().await;
        Ok(state
            .live()
            .filter(|r| r.status == ReceiptStatus::Pending && r.created_at <= cutoff)
            .cloned()
            .collect())
    }

    async fn set_status(
        &self,
        id: ReceiptId,
        expected: ReceiptStatus,
        status: ReceiptStatus,
    ) -> StoreResult<Option<Receipt>> {
        let mut state = self.state.write().await;
        let Some(receipt) = state
            .receipts
            .get_mut(&id)
            .filter(|r| r.is_live() && r.status == expected)
        else {
            return Ok(None);
        };
        receipt.status = status;
        receipt.updated_at = Utc::now();
        Ok(Some(receipt.clone()))
    }

    async fn soft_delete(&self, id: ReceiptId) -> StoreResult<Option<Receipt>> {
        if self.fail_on_delete.load(Ordering::SeqCst) {
            return Err(ReceiptStoreError::Unavailable(
                "receipt delete rejected by storage".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let Some(receipt) = state.receipts.get_mut(&id).filter(|r| r.is_live()) else {
            return Ok(None);
        };
        let now = Utc::now();
        receipt.deleted_at = Some(now);
        receipt.updated_at = now;
        Ok(Some(receipt.clone()))
    }
}
