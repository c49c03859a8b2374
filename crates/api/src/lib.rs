//! HTTP API server for the booking saga platform.
//!
//! Provides REST endpoints for booking creation, lookup and cancellation,
//! plus operator endpoints for the stale-booking janitor, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use booking_store::BookingStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{BookingSaga, CancellationToken, InventoryClient, Janitor};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, I>(state: Arc<AppState<S, I>>, metrics_handle: PrometheusHandle) -> Router
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/bookings",
            post(routes::bookings::create::<S, I>).get(routes::bookings::list::<S, I>),
        )
        .route(
            "/bookings/{id}",
            get(routes::bookings::get::<S, I>).delete(routes::bookings::cancel::<S, I>),
        )
        .route("/admin/cleanup", post(routes::admin::cleanup::<S, I>))
        .route("/admin/bookings", get(routes::admin::by_status::<S, I>))
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

/// Wires the saga and janitor over `store` and `inventory` using `config`.
pub fn create_default_state<S, I>(
    store: S,
    inventory: I,
    config: &Config,
    shutdown: CancellationToken,
) -> Arc<AppState<S, I>>
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    let saga =
        Arc::new(BookingSaga::new(store, inventory).with_retry_policy(config.retry_policy()));
    let janitor = Arc::new(Janitor::new(saga.clone(), config.janitor_config()));

    Arc::new(AppState {
        saga,
        janitor,
        shutdown,
    })
}
