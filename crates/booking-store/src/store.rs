use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OwnerId;
use domain::{Booking, BookingStatus, StatusChange};

use crate::{BookingId, RequestId, Result};

/// Core trait for booking store implementations.
///
/// A booking store is the only shared mutable state of the saga. Every
/// mutation is a single-row write keyed by booking id or request id.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a new booking.
    ///
    /// Fails with `DuplicateRequest` if a booking already exists for the same
    /// request id. The uniqueness check and the insert are atomic with respect
    /// to concurrent callers, including callers in other processes.
    async fn insert(&self, booking: Booking) -> Result<Booking>;

    /// Applies a compare-and-swap status change.
    ///
    /// The write only happens if the stored status equals `change.from`;
    /// otherwise fails with `StatusConflict` carrying the actual status.
    /// Returns the updated booking.
    async fn update_status(&self, id: BookingId, change: StatusChange) -> Result<Booking>;

    /// Retrieves a booking by id.
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Retrieves the booking created for an idempotency key.
    async fn find_by_request_id(&self, request_id: &RequestId) -> Result<Option<Booking>>;

    /// Retrieves PENDING bookings created strictly before `cutoff`, oldest first.
    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Retrieves an owner's bookings, newest first.
    async fn find_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>>;

    /// Retrieves bookings in a status, newest first.
    async fn find_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>>;

    /// Retrieves every booking, newest first.
    async fn find_all(&self) -> Result<Vec<Booking>>;
}
