//! Saga error types.

use booking_store::StoreError;
use common::BookingId;
use domain::BookingStatus;
use thiserror::Error;

use crate::state::SagaState;

/// Failures talking to the inventory service.
///
/// Every variant except `Cancelled` is retried by the saga's retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The request never produced an HTTP response (connect, timeout, reset).
    #[error("inventory transport error: {0}")]
    Transport(String),

    /// The inventory service answered with a non-success status.
    #[error("inventory returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("undecodable inventory response: {0}")]
    Decode(String),

    /// The caller gave up while the call or its retry delay was pending.
    #[error("inventory call cancelled")]
    Cancelled,
}

impl InventoryError {
    /// Returns true if another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, InventoryError::Cancelled)
    }
}

impl From<reqwest::Error> for InventoryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            InventoryError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            InventoryError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            InventoryError::Transport(e.to_string())
        }
    }
}

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The inventory service refused the room; the booking was cancelled.
    #[error("room unavailable: {reason}")]
    RoomUnavailable { booking_id: BookingId, reason: String },

    /// The inventory service could not be reached after all attempts; the
    /// booking was cancelled.
    #[error("booking failed: {cause}")]
    InventoryUnreachable {
        booking_id: BookingId,
        cause: InventoryError,
    },

    /// A compare-and-swap status write found an unexpected status.
    #[error("booking {booking_id} is {actual}, expected {expected}")]
    StorageConflict {
        booking_id: BookingId,
        expected: BookingStatus,
        actual: BookingStatus,
    },

    /// The caller cancelled the saga while it waited on inventory. The
    /// booking stays PENDING until the janitor resolves it.
    #[error("booking {booking_id} was interrupted before inventory answered")]
    Cancelled { booking_id: BookingId },

    /// No booking with this id belongs to the caller.
    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),

    /// The requested user action does not apply to the booking's status.
    #[error("booking {booking_id} is {status}; only CONFIRMED bookings can be cancelled")]
    InvalidTransition {
        booking_id: BookingId,
        status: BookingStatus,
    },

    /// The saga state machine was asked to make an illegal move.
    #[error("illegal saga transition: {from} -> {to}")]
    IllegalTransition { from: SagaState, to: SagaState },

    /// The janitor's stale-after threshold reaches before the earliest
    /// representable timestamp.
    #[error("stale-after threshold {stale_after} is out of range")]
    StaleCutoffOutOfRange { stale_after: chrono::Duration },

    /// Booking store error.
    #[error("booking store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SagaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StatusConflict {
                booking_id,
                expected,
                actual,
            } => SagaError::StorageConflict {
                booking_id,
                expected,
                actual,
            },
            StoreError::NotFound(id) => SagaError::BookingNotFound(id),
            other => SagaError::Store(other),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
