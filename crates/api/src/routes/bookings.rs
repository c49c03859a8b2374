//! Booking creation, lookup and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use booking_store::BookingStore;
use chrono::NaiveDate;
use common::{BookingId, OwnerId, RoomId};
use domain::{Booking, BookingRequest, DateRange, GuestCount};
use saga::{BookingSaga, CancellationToken, InventoryClient, Janitor};
use serde::Deserialize;

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Shared application state accessible from all handlers.
pub struct AppState<S: BookingStore, I: InventoryClient> {
    pub saga: Arc<BookingSaga<S, I>>,
    pub janitor: Arc<Janitor<S, I>>,
    /// Cancelled on shutdown; aborts sagas still waiting on inventory.
    pub shutdown: CancellationToken,
}

/// The calling user, taken from the `x-owner-id` header.
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub OwnerId);

impl<St: Send + Sync> FromRequestParts<St> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| ApiError::BadRequest(format!("missing {OWNER_HEADER} header")))?;

        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| Owner(OwnerId::new(id)))
            .ok_or_else(|| ApiError::BadRequest(format!("invalid {OWNER_HEADER} header")))
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guest_count: u8,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl CreateBookingRequest {
    fn into_domain(self) -> Result<BookingRequest, ApiError> {
        let dates = DateRange::new(self.start_date, self.end_date)?;
        let guests = GuestCount::new(self.guest_count)?;

        let mut request = BookingRequest::new(RoomId::new(self.room_id), dates, guests);
        if let Some(notes) = self.notes {
            request = request.with_notes(notes);
        }
        if let Some(request_id) = self.request_id.filter(|r| !r.trim().is_empty()) {
            request = request.with_request_id(request_id);
        }
        request.validate()?;
        Ok(request)
    }
}

// -- Handlers --

/// POST /bookings: run the booking creation saga.
#[tracing::instrument(skip(state, owner, req), fields(owner_id = %owner.0))]
pub async fn create<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    owner: Owner,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError>
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    let request = req.into_domain()?;
    let booking = state
        .saga
        .create_booking_with_cancel(request, owner.0, &state.shutdown)
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /bookings: the caller's bookings, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    owner: Owner,
) -> Result<Json<Vec<Booking>>, ApiError>
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    Ok(Json(state.saga.list_owner_bookings(owner.0).await?))
}

/// GET /bookings/{id}: one of the caller's bookings.
#[tracing::instrument(skip(state))]
pub async fn get<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError>
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    let booking_id = parse_booking_id(&id)?;
    Ok(Json(state.saga.get_booking(booking_id, owner.0).await?))
}

/// DELETE /bookings/{id}: cancel one of the caller's confirmed bookings.
#[tracing::instrument(skip(state))]
pub async fn cancel<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError>
where
    S: BookingStore + 'static,
    I: InventoryClient + 'static,
{
    let booking_id = parse_booking_id(&id)?;
    Ok(Json(state.saga.cancel_booking(booking_id, owner.0).await?))
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(BookingId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid booking id: {e}")))
}
