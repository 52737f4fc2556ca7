//! HTTP API for the receipt ledger.
//!
//! Exposes receipts and books over REST, with structured logging (tracing)
//! and Prometheus metrics. The placement service is the main caller.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use inventory::{BookStore, InMemoryBookStore};
use ledger::{InMemoryReceiptStore, ReceiptLedger, ReceiptStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<R: ReceiptStore, B: BookStore> {
    pub ledger: ReceiptLedger<R, B>,
}

impl<R: ReceiptStore, B: BookStore> AppState<R, B> {
    pub fn new(ledger: ReceiptLedger<R, B>) -> Self {
        Self { ledger }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, B>(state: Arc<AppState<R, B>>, metrics_handle: PrometheusHandle) -> Router
where
    R: ReceiptStore + 'static,
    B: BookStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/receipts",
            post(routes::receipts::create::<R, B>).get(routes::receipts::list::<R, B>),
        )
        .route(
            "/receipts/{id}",
            get(routes::receipts::get::<R, B>).delete(routes::receipts::delete::<R, B>),
        )
        .route(
            "/receipts/{id}/status",
            patch(routes::receipts::update_status::<R, B>),
        )
        .route(
            "/receipts/user/{user_id}",
            get(routes::receipts::for_user::<R, B>),
        )
        .route(
            "/books",
            post(routes::books::create::<R, B>).get(routes::books::list::<R, B>),
        )
        .route(
            "/books/{id}",
            get(routes::books::get::<R, B>)
                .put(routes::books::update::<R, B>)
                .delete(routes::books::delete::<R, B>),
        )
        .route(
            "/books/category/{category_id}",
            get(routes::books::by_category::<R, B>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over in-memory stores.
pub fn create_default_state(
    loan_period: chrono::Duration,
) -> (
    Arc<AppState<InMemoryReceiptStore, InMemoryBookStore>>,
    InMemoryReceiptStore,
    InMemoryBookStore,
) {
    let receipts = InMemoryReceiptStore::new();
    let books = InMemoryBookStore::new();
    let ledger =
        ReceiptLedger::new(receipts.clone(), books.clone()).with_loan_period(loan_period);

    (Arc::new(AppState::new(ledger)), receipts, books)
}

/// Periodically removes pending receipts whose book was never claimed.
pub fn spawn_reclaimer<R, B>(
    state: Arc<AppState<R, B>>,
    older_than: chrono::Duration,
    every: std::time::Duration,
) -> JoinHandle<()>
where
    R: ReceiptStore + 'static,
    B: BookStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = state.ledger.reclaim_abandoned(older_than).await {
                tracing::warn!(error = %e, "reclaim sweep failed");
            }
        }
    })
}
