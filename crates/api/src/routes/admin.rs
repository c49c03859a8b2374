//! Operator endpoints: on-demand janitor sweep and status listing.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use booking_store::BookingStore;
use domain::{Booking, BookingStatus};
use saga::InventoryClient;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::bookings::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub reaped: usize,
}

/// POST /admin/cleanup: run one janitor sweep now.
#[tracing::instrument(skip(state))]
pub async fn cleanup<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
) -> Result<Json<CleanupResponse>, ApiError>
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    let reaped = state.janitor.run_cleanup().await?;
    Ok(Json(CleanupResponse { reaped }))
}

/// GET /admin/bookings[?status=PENDING]: every booking, or those in one status.
#[tracing::instrument(skip(state))]
pub async fn by_status<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Booking>>, ApiError>
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    let bookings = match query.status.as_deref() {
        Some(status) => {
            let status: BookingStatus = status.parse()?;
            state.saga.list_by_status(status).await?
        }
        None => state.saga.list_all().await?,
    };
    Ok(Json(bookings))
}
