//! HTTP client for the receipt ledger.
//!
//! Used by the placement service, which shares no storage with the ledger.

pub mod client;
pub mod error;

pub use client::{
    ClientConfig, DEFAULT_TIMEOUT, PlacedReceipt, ReceiptGateway, RemoteReceiptClient,
};
pub use error::{ReceiptClientError, Result};
