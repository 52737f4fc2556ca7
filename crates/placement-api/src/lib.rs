//! User-facing placement service.
//!
//! Authenticates callers and forwards placement requests to the ledger over
//! HTTP. It shares no storage with the ledger and keeps no state of its own.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use receipt_client::ReceiptGateway;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use auth::JwtKeys;
use coordinator::PlacementCoordinator;

/// Shared application state accessible from all handlers.
pub struct AppState<G: ReceiptGateway> {
    pub coordinator: PlacementCoordinator<G>,
    pub keys: JwtKeys,
}

impl<G: ReceiptGateway> AppState<G> {
    pub fn new(gateway: G, keys: JwtKeys) -> Self {
        Self {
            coordinator: PlacementCoordinator::new(gateway),
            keys,
        }
    }
}

/// Creates the Axum application router.
///
/// `request_timeout` bounds each request end to end; it should exceed the
/// ledger client timeout so ledger failures surface as their own errors.
pub fn create_app<G: ReceiptGateway + 'static>(
    state: Arc<AppState<G>>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/receipts",
            post(routes::receipts::place::<G>).get(routes::receipts::mine::<G>),
        )
        .route("/receipts/{id}/cancel", post(routes::receipts::cancel::<G>))
        .with_state(state)
        .merge(metrics_router)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
