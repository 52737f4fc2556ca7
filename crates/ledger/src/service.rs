//! Receipt ledger: the loan lifecycle kept in step with book availability.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{
    Book, BookId, BookStatus, CategoryId, Page, PageRequest, ReceiptId, ReceiptStatus,
    ReceiptView, UserId,
};
use inventory::{BookStore, InventoryError, NewBook};

use crate::error::{LedgerError, ReceiptStoreError, Result};
use crate::receipt::{DEFAULT_LOAN_PERIOD_DAYS, NewReceipt, PlaceReceipt, Receipt};
use crate::store::{ReceiptStore, TransactionalPlacement};

/// Outcome of [`ReceiptLedger::create_receipt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new receipt was created and its book placed.
    Created(ReceiptView),
    /// The idempotency key matched an earlier placement; nothing changed.
    Replayed(ReceiptView),
}

impl CreateOutcome {
    pub fn receipt(&self) -> &ReceiptView {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::Replayed(r) => r,
        }
    }

    pub fn into_receipt(self) -> ReceiptView {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::Replayed(r) => r,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, CreateOutcome::Replayed(_))
    }
}

/// Owns receipts and drives the book side effects of their lifecycle.
///
/// Placement writes a receipt row and a book row. When a
/// [`TransactionalPlacement`] backend is configured both writes commit
/// together; otherwise the ledger runs them as a two-step saga and deletes the
/// provisional receipt if the book cannot be claimed.
pub struct ReceiptLedger<R, B>
where
    R: ReceiptStore,
    B: BookStore,
{
    receipts: R,
    books: B,
    loan_period: Duration,
    transactional: Option<Arc<dyn TransactionalPlacement>>,
}

impl<R, B> ReceiptLedger<R, B>
where
    R: ReceiptStore,
    B: BookStore,
{
    /// Creates a ledger over the given stores using saga placement.
    pub fn new(receipts: R, books: B) -> Self {
        Self {
            receipts,
            books,
            loan_period: Duration::days(DEFAULT_LOAN_PERIOD_DAYS),
            transactional: None,
        }
    }

    /// Sets the loan period used to compute `due_date`.
    pub fn with_loan_period(mut self, loan_period: Duration) -> Self {
        self.loan_period = loan_period;
        self
    }

    /// Places receipts through a single storage transaction instead of the saga.
    pub fn with_transactional_placement(mut self, backend: Arc<dyn TransactionalPlacement>) -> Self {
        self.transactional = Some(backend);
        self
    }

    /// Returns the receipt store.
    pub fn receipts(&self) -> &R {
        &self.receipts
    }

    /// Returns the book store.
    pub fn books(&self) -> &B {
        &self.books
    }

    /// Creates a `pending` receipt and moves its book `available → placed`.
    ///
    /// Fails with `Conflict` if the book is not available; in that case no
    /// receipt remains visible. Repeating a request with the same idempotency
    /// key returns the original receipt without touching the book again.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id, book_id = %cmd.book_id))]
    pub async fn create_receipt(&self, cmd: PlaceReceipt) -> Result<CreateOutcome> {
        cmd.validate().map_err(LedgerError::Validation)?;
        let started = std::time::Instant::now();

        if let Some(existing) = self.replay(&cmd).await? {
            return Ok(existing);
        }

        let new = NewReceipt::pending(&cmd, Utc::now(), self.loan_period);
        let placed = match &self.transactional {
            Some(backend) => self.place_atomically(backend.as_ref(), new).await,
            None => self.place_with_compensation(new).await,
        };

        let receipt = match placed {
            Ok(receipt) => receipt,
            // A concurrent request with the same key won the insert.
            Err(LedgerError::Store(ReceiptStoreError::DuplicateKey(_))) => {
                return self.replay(&cmd).await?.ok_or_else(|| {
                    LedgerError::Conflict("idempotency key is being processed".to_string())
                });
            }
            Err(LedgerError::Conflict(reason)) => {
                metrics::counter!("receipt_conflicts_total").increment(1);
                tracing::info!(%reason, "placement rejected");
                return Err(LedgerError::Conflict(reason));
            }
            Err(e) => return Err(e),
        };

        metrics::counter!("receipts_created_total").increment(1);
        metrics::histogram!("receipt_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(receipt_id = %receipt.id, "receipt created");

        let book = self.books.get(receipt.book_id).await?;
        Ok(CreateOutcome::Created(receipt.into_view(book)))
    }

    /// Returns the earlier placement made with the same idempotency key.
    async fn replay(&self, cmd: &PlaceReceipt) -> Result<Option<CreateOutcome>> {
        let Some(key) = cmd.idempotency_key.as_deref() else {
            return Ok(None);
        };
        let Some(existing) = self.receipts.find_by_key(key).await? else {
            return Ok(None);
        };

        if !cmd.matches(&existing) {
            return Err(LedgerError::Validation(
                "idempotency key was used for a different placement".to_string(),
            ));
        }

        tracing::debug!(receipt_id = %existing.id, "idempotent replay");
        let view = self.view(existing).await?;
        Ok(Some(CreateOutcome::Replayed(view)))
    }

    async fn place_atomically(
        &self,
        backend: &dyn TransactionalPlacement,
        new: NewReceipt,
    ) -> Result<Receipt> {
        let book_id = new.book_id;
        backend
            .insert_and_claim(new)
            .await?
            .ok_or_else(|| not_available(book_id))
    }

    /// Saga: insert the provisional receipt, then claim the book; undo the
    /// insert if the claim does not succeed.
    async fn place_with_compensation(&self, new: NewReceipt) -> Result<Receipt> {
        let book_id = new.book_id;

        let receipt = self.receipts.insert(new).await?;

        match self
            .books
            .try_transition(book_id, BookStatus::Available, BookStatus::Placed)
            .await
        {
            Ok(true) => Ok(receipt),
            Ok(false) => {
                self.compensate(&receipt, "book not available").await?;
                Err(not_available(book_id))
            }
            Err(InventoryError::BookNotFound(id)) => {
                self.compensate(&receipt, "book not found").await?;
                Err(LedgerError::BookNotFound(id))
            }
            Err(e) => {
                self.compensate(&receipt, "book transition failed").await?;
                Err(LedgerError::Inventory(e))
            }
        }
    }

    /// Deletes a provisional receipt whose book could not be claimed.
    async fn compensate(&self, receipt: &Receipt, reason: &str) -> Result<()> {
        metrics::counter!("receipt_compensations_total").increment(1);

        match self.receipts.soft_delete(receipt.id).await {
            Ok(_) => {
                tracing::warn!(receipt_id = %receipt.id, %reason, "provisional receipt removed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    receipt_id = %receipt.id,
                    %reason,
                    error = %e,
                    "compensation failed, receipt left pending"
                );
                Err(LedgerError::CompensationFailed {
                    receipt_id: receipt.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Changes a receipt's status and applies the book state it implies.
    ///
    /// Only a receipt that holds its book (`pending` or `owned`) moves the
    /// book, and that write is unconditional: a return frees the book whatever
    /// flag it carries. `owned` leaves the book untouched. A closed receipt
    /// cannot be canceled, and reopening one must claim its book again.
    #[tracing::instrument(skip(self))]
    pub async fn update_receipt_status(
        &self,
        id: ReceiptId,
        status: ReceiptStatus,
    ) -> Result<ReceiptView> {
        let current = self
            .receipts
            .get(id)
            .await?
            .ok_or(LedgerError::ReceiptNotFound(id))?;
        let held = current.status.is_active();

        if !held && status == ReceiptStatus::Canceled {
            return Err(LedgerError::Conflict(format!(
                "receipt {id} is {} and cannot be canceled",
                current.status
            )));
        }

        let receipt = match self.receipts.set_status(id, current.status, status).await? {
            Some(receipt) => receipt,
            None => return Err(self.lost_update(id).await),
        };

        let book = if held {
            self.apply_book_effect(&receipt).await?
        } else if status.is_active() {
            self.reopen(&receipt, current.status).await?
        } else {
            self.books.get(receipt.book_id).await?
        };

        metrics::counter!("receipt_status_updates_total", "status" => status.as_str())
            .increment(1);
        tracing::info!(
            receipt_id = %id,
            from = %current.status,
            to = %status,
            "receipt status updated"
        );
        Ok(receipt.into_view(book))
    }

    async fn apply_book_effect(&self, receipt: &Receipt) -> Result<Option<Book>> {
        let Some(book_status) = receipt.status.book_effect() else {
            return Ok(self.books.get(receipt.book_id).await?);
        };

        let book = self
            .books
            .force_status(receipt.book_id, book_status)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    receipt_id = %receipt.id,
                    book_id = %receipt.book_id,
                    error = %e,
                    "receipt status written but book update failed"
                );
            })?;
        Ok(Some(book))
    }

    /// Claims the book for a receipt moved from `previous` back to an active
    /// status, restoring `previous` if the book is held elsewhere.
    async fn reopen(&self, receipt: &Receipt, previous: ReceiptStatus) -> Result<Option<Book>> {
        let failure = match self
            .books
            .try_transition(receipt.book_id, BookStatus::Available, BookStatus::Placed)
            .await
        {
            Ok(true) => return Ok(self.books.get(receipt.book_id).await?),
            Ok(false) => not_available(receipt.book_id),
            Err(e) => e.into(),
        };

        match self
            .receipts
            .set_status(receipt.id, receipt.status, previous)
            .await
        {
            Ok(Some(_)) => Err(failure),
            Ok(None) => Err(LedgerError::CompensationFailed {
                receipt_id: receipt.id,
                reason: "receipt changed before it could be restored".to_string(),
            }),
            Err(e) => {
                tracing::error!(
                    receipt_id = %receipt.id,
                    error = %e,
                    "failed to restore receipt after rejected reopen"
                );
                Err(LedgerError::CompensationFailed {
                    receipt_id: receipt.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Explains a status write that matched no row.
    async fn lost_update(&self, id: ReceiptId) -> LedgerError {
        match self.receipts.get(id).await {
            Ok(Some(_)) => {
                LedgerError::Conflict(format!("receipt {id} was changed concurrently"))
            }
            Ok(None) => LedgerError::ReceiptNotFound(id),
            Err(e) => e.into(),
        }
    }

    /// Loads a receipt with its book.
    #[tracing::instrument(skip(self))]
    pub async fn get_receipt(&self, id: ReceiptId) -> Result<ReceiptView> {
        let receipt = self
            .receipts
            .get(id)
            .await?
            .ok_or(LedgerError::ReceiptNotFound(id))?;
        self.view(receipt).await
    }

    /// Lists a user's receipts with their books.
    #[tracing::instrument(skip(self))]
    pub async fn receipts_for_user(&self, user_id: UserId) -> Result<Vec<ReceiptView>> {
        let receipts = self.receipts.list_by_user(user_id).await?;
        self.views(receipts).await
    }

    /// Lists one page of receipts with their books.
    #[tracing::instrument(skip(self))]
    pub async fn list_receipts(&self, page: PageRequest) -> Result<Page<ReceiptView>> {
        let Page { items, total } = self.receipts.list(page).await?;
        Ok(Page {
            items: self.views(items).await?,
            total,
        })
    }

    /// Soft-deletes a receipt. An active receipt releases its book.
    #[tracing::instrument(skip(self))]
    pub async fn delete_receipt(&self, id: ReceiptId) -> Result<()> {
        let receipt = self
            .receipts
            .soft_delete(id)
            .await?
            .ok_or(LedgerError::ReceiptNotFound(id))?;

        if receipt.status.is_active() {
            self.books
                .force_status(receipt.book_id, BookStatus::Available)
                .await?;
        }

        tracing::info!(receipt_id = %id, "receipt deleted");
        Ok(())
    }

    /// Removes provisional receipts left behind by an interrupted placement.
    ///
    /// A `pending` receipt older than `older_than` whose book is still
    /// `available` never got its book claimed. Returns the reclaimed ids.
    #[tracing::instrument(skip(self))]
    pub async fn reclaim_abandoned(&self, older_than: Duration) -> Result<Vec<ReceiptId>> {
        let cutoff = Utc::now() - older_than;
        let mut reclaimed = Vec::new();

        for receipt in self.receipts.list_pending_before(cutoff).await? {
            let orphaned = match self.books.get(receipt.book_id).await? {
                Some(book) => book.status == BookStatus::Available,
                None => true,
            };
            if orphaned && self.receipts.soft_delete(receipt.id).await?.is_some() {
                reclaimed.push(receipt.id);
            }
        }

        if !reclaimed.is_empty() {
            metrics::counter!("receipts_reclaimed_total").increment(reclaimed.len() as u64);
            tracing::warn!(count = reclaimed.len(), "abandoned receipts reclaimed");
        }
        Ok(reclaimed)
    }

    /// Adds a book to the inventory.
    #[tracing::instrument(skip(self, book), fields(title = %book.title))]
    pub async fn create_book(&self, book: NewBook) -> Result<Book> {
        book.validate()?;
        let book = self.books.insert(book).await?;
        tracing::info!(book_id = %book.id, "book created");
        Ok(book)
    }

    pub async fn get_book(&self, id: BookId) -> Result<Book> {
        self.books
            .get(id)
            .await?
            .ok_or(LedgerError::BookNotFound(id))
    }

    pub async fn list_books(&self, page: PageRequest) -> Result<Page<Book>> {
        Ok(self.books.list(page).await?)
    }

    pub async fn books_in_category(&self, category_id: CategoryId) -> Result<Vec<Book>> {
        Ok(self.books.list_by_category(category_id).await?)
    }

    /// Edits a book's descriptive fields. Its status is never touched.
    #[tracing::instrument(skip(self, details), fields(title = %details.title))]
    pub async fn update_book(&self, id: BookId, details: NewBook) -> Result<Book> {
        let book = self.books.update(id, details).await?;
        tracing::info!(book_id = %id, "book updated");
        Ok(book)
    }

    /// Deletes a book that no active receipt holds.
    ///
    /// A placed or taken book answers `Conflict`; the check and the delete
    /// are one conditional write, so a concurrent placement cannot slip in.
    #[tracing::instrument(skip(self))]
    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        if !self.books.try_delete(id).await? {
            return Err(LedgerError::Conflict(format!(
                "book {id} is on loan and cannot be deleted"
            )));
        }
        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }

    async fn view(&self, receipt: Receipt) -> Result<ReceiptView> {
        let book = self.books.get(receipt.book_id).await?;
        Ok(receipt.into_view(book))
    }

    async fn views(&self, receipts: Vec<Receipt>) -> Result<Vec<ReceiptView>> {
        let mut books: HashMap<BookId, Option<Book>> = HashMap::new();
        let mut views = Vec::with_capacity(receipts.len());

        for receipt in receipts {
            let book = match books.get(&receipt.book_id) {
                Some(book) => book.clone(),
                None => {
                    let book = self.books.get(receipt.book_id).await?;
                    books.insert(receipt.book_id, book.clone());
                    book
                }
            };
            views.push(receipt.into_view(book));
        }
        Ok(views)
    }
}

fn not_available(book_id: BookId) -> LedgerError {
    LedgerError::Conflict(format!("book {book_id} not available"))
}
