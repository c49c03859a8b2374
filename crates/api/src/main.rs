//! API server entry point.

use api::config::{Config, LogFormat};
use booking_store::{BookingStore, InMemoryBookingStore, PostgresBookingStore};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{CancellationToken, HttpInventoryClient};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

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

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Runs the server and janitor over `store` until a shutdown signal arrives.
async fn serve<S: BookingStore + 'static>(
    config: Config,
    store: S,
    inventory: HttpInventoryClient,
    metrics_handle: PrometheusHandle,
) {
    let shutdown = CancellationToken::new();
    let state = api::create_default_state(store, inventory, &config, shutdown.clone());

    let janitor = state.janitor.clone();
    let janitor_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { janitor.run(shutdown).await }
    });

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                shutdown_signal().await;
                shutdown.cancel();
            }
        })
        .await
        .expect("server error");

    shutdown.cancel();
    if let Err(e) = janitor_task.await {
        tracing::error!(error = %e, "janitor task panicked");
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Inventory client
    let inventory = HttpInventoryClient::new(&config.inventory_url, config.inventory_timeout)
        .expect("failed to build inventory HTTP client");
    tracing::info!(
        inventory_url = %inventory.base_url(),
        max_attempts = config.inventory_max_attempts,
        "inventory client ready"
    );

    // 4. Booking store, then serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresBookingStore::connect(&url, config.database_max_connections)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL booking store");
            serve(config, store, inventory, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory booking store");
            serve(config, InMemoryBookingStore::new(), inventory, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
