//! Receipt ledger for the library loan services.
//!
//! A receipt records that a user has a book on loan. Creating one claims the
//! book through the inventory's compare-and-swap, so two concurrent requests
//! for the same book can never both succeed.
//!
//! Placement follows these steps:
//! 1. Insert a `pending` receipt
//! 2. Move the book `available → placed`
//!
//! If step 2 does not succeed the receipt from step 1 is soft-deleted. When
//! receipts and books share a database, both steps run in one transaction
//! instead (see [`TransactionalPlacement`]).

pub mod error;
pub mod memory;
pub mod postgres;
pub mod receipt;
pub mod service;
pub mod store;

pub use error::{LedgerError, ReceiptStoreError, Result};
pub use memory::InMemoryReceiptStore;
pub use postgres::PostgresReceiptStore;
pub use receipt::{DEFAULT_LOAN_PERIOD_DAYS, NewReceipt, PlaceReceipt, Receipt};
pub use service::{CreateOutcome, ReceiptLedger};
pub use store::{ReceiptStore, TransactionalPlacement};
