//! Placement server entry point.

use std::sync::Arc;
use std::time::Duration;

use placement_api::AppState;
use placement_api::auth::JwtKeys;
use placement_api::config::Config;
use receipt_client::{ClientConfig, RemoteReceiptClient};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Slack on top of the ledger timeout before the whole request is abandoned.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(1);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build the ledger client and application state
    let secret = config
        .jwt_secret
        .as_deref()
        .expect("JWT_SECRET must be set");
    let client = RemoteReceiptClient::new(
        ClientConfig::new(&config.ledger_base_url).with_timeout(config.ledger_timeout()),
    )
    .expect("failed to build ledger client");
    let state = Arc::new(AppState::new(client, JwtKeys::new(secret)));

    // 4. Build the application
    let app = placement_api::create_app(
        state,
        metrics_handle,
        config.ledger_timeout() + REQUEST_TIMEOUT_SLACK,
    );

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, ledger = %config.ledger_base_url, "starting placement server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
