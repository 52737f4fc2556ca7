//! Book inventory for the library loan services.
//!
//! Owns books and their availability state machine. The only write path used
//! by the loan protocol is the compare-and-swap [`BookStore::try_transition`]
//! plus the explicit [`BookStore::force_status`] override.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{Book, BookId, BookStatus, CategoryId, Page, PageRequest};
pub use error::{InventoryError, Result};
pub use memory::InMemoryBookStore;
pub use postgres::PostgresBookStore;
pub use store::{BookStore, NewBook};
