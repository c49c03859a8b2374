use domain::{BookingError, BookingStatus};
use thiserror::Error;

use crate::{BookingId, RequestId};

/// Errors that can occur when interacting with the booking store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A booking already exists for this idempotency key.
    #[error("Duplicate request: a booking already exists for request {0}")]
    DuplicateRequest(RequestId),

    /// A conditional status write found the booking in a different status.
    #[error(
        "Status conflict for booking {booking_id}: expected {expected}, found {actual}"
    )]
    StatusConflict {
        booking_id: BookingId,
        expected: BookingStatus,
        actual: BookingStatus,
    },

    /// The status machine forbids the requested change.
    #[error("Rejected status change: {0}")]
    InvalidChange(BookingError),

    /// The booking was not found.
    #[error("Booking not found: {0}")]
    NotFound(BookingId),

    /// A stored row violates a booking invariant.
    #[error("Corrupt booking row: {0}")]
    Corrupt(#[from] BookingError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for booking store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
