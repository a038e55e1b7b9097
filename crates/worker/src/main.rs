//! Payment-closed worker.
//!
//! Consumes payment-closed notifications and takes each paid order in as a
//! RECEIVED preparation, sharing the database with the HTTP API.

mod config;

use std::sync::Arc;

use preparation_core::service::PreparationService;
use preparation_db::PgPreparationStore;
use preparation_events::{PaymentClosedListener, SqsListenerConfig, SqsMessageSource};
use preparation_orders::{ApiOrderInfoProvider, OrderApiConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::WorkerConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "preparation_worker=debug,preparation_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    let order_config = OrderApiConfig::from_env();
    let queue_config = SqsListenerConfig::from_env();
    tracing::info!(queue = %queue_config.queue_name, "Loaded worker configuration");

    // --- Database ---
    let pool = preparation_db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");
    preparation_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Use cases ---
    let orders = ApiOrderInfoProvider::new(&order_config).expect("Invalid order API configuration");
    let service = Arc::new(PreparationService::new(
        Arc::new(PgPreparationStore::new(pool.clone())),
        Arc::new(orders),
    ));

    // --- Listener ---
    let source = SqsMessageSource::connect(queue_config)
        .await
        .expect("Failed to connect to payment-closed queue");
    let listener = PaymentClosedListener::new(source, service);

    let cancel = CancellationToken::new();
    let listener_cancel = cancel.clone();
    let listener_handle = tokio::spawn(async move {
        listener.run(listener_cancel).await;
    });

    shutdown_signal().await;
    cancel.cancel();
    if let Err(e) = listener_handle.await {
        tracing::error!(error = %e, "Listener task failed");
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
