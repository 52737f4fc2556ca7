//! Ledger server entry point.

use std::sync::Arc;

use inventory::{BookStore, PostgresBookStore};
use ledger::{PostgresReceiptStore, ReceiptLedger, ReceiptStore};
use ledger_api::AppState;
use ledger_api::config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const RECLAIM_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

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

async fn serve<R, B>(config: &Config, state: Arc<AppState<R, B>>, metrics_handle: PrometheusHandle)
where
    R: ReceiptStore + 'static,
    B: BookStore + 'static,
{
    if config.reclaim_after_secs > 0 {
        let older_than = chrono::Duration::seconds(config.reclaim_after_secs as i64);
        ledger_api::spawn_reclaimer(state.clone(), older_than, RECLAIM_INTERVAL);
    }

    let app = ledger_api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting ledger server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
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

    let loan_period = chrono::Duration::days(config.loan_period_days);

    // 3. Choose storage and serve
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");

            let books = PostgresBookStore::new(pool.clone());
            books
                .run_migrations()
                .await
                .expect("failed to run migrations");

            let receipts = PostgresReceiptStore::new(pool);
            let ledger = ReceiptLedger::new(receipts.clone(), books)
                .with_loan_period(loan_period)
                .with_transactional_placement(Arc::new(receipts));

            tracing::info!("using PostgreSQL storage");
            serve(&config, Arc::new(AppState::new(ledger)), metrics_handle).await;
        }
        None => {
            let (state, _, _) = ledger_api::create_default_state(loan_period);
            tracing::info!("using in-memory storage");
            serve(&config, state, metrics_handle).await;
        }
    }
}
