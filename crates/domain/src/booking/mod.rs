//! Booking record, status machine and value objects.

mod model;
mod state;
mod value_objects;

pub use model::{Booking, BookingRequest, StatusChange};
pub use state::BookingStatus;
pub use value_objects::{DateRange, GuestCount, Money};

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by booking invariants.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Check-in must precede check-out.
    #[error("Invalid date range: start {start} must be before end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Guest count outside the allowed bounds.
    #[error("Invalid guest count: {count} (must be between 1 and 10)")]
    InvalidGuestCount { count: u8 },

    /// Idempotency key longer than the store accepts.
    #[error("Invalid request id: {len} characters (at most {max} allowed)")]
    RequestIdTooLong { len: usize, max: usize },

    /// The status machine forbids this transition.
    #[error("Invalid state transition: cannot move from {from} to {to}")]
    InvalidStateTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// A conditional write found the record in a different status.
    #[error("Status mismatch: expected {expected}, found {actual}")]
    StatusMismatch {
        expected: BookingStatus,
        actual: BookingStatus,
    },

    /// A status string that does not name any status.
    #[error("Unknown booking status: {0}")]
    UnknownStatus(String),
}
