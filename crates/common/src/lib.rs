//! Shared types for the library loan services.
//!
//! Both the ledger service and the placement service speak in these types, so
//! the JSON contract between them is defined once.

pub mod page;
pub mod status;
pub mod types;
pub mod wire;

pub use page::{Page, PageRequest};
pub use status::{BookStatus, ParseStatusError, ReceiptStatus};
pub use types::{BookId, CategoryId, ReceiptId, UserId};
pub use wire::{
    Book, ErrorBody, IDEMPOTENCY_KEY_HEADER, MessageBody, PlaceReceiptBody, ReceiptPage,
    ReceiptView,
};
