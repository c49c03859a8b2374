//! Booking status machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::BookingError;

/// The status of a booking record.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed ──(user cancellation)──► Cancelled
///           └──► Cancelled
/// ```
///
/// `Confirmed` and `Cancelled` are terminal for the saga. The only move out
/// of `Confirmed` is an explicit cancellation requested by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Written before any remote call; awaiting the inventory decision.
    #[default]
    Pending,

    /// Inventory confirmed the room.
    Confirmed,

    /// Compensated by the saga or the janitor, or cancelled by the owner.
    Cancelled,
}

impl BookingStatus {
    /// Returns true if the saga may confirm a booking in this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if the compensation path may cancel a booking in this status.
    pub fn can_compensate(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if the owner may cancel a booking in this status.
    pub fn can_owner_cancel(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }

    /// Returns true if the saga has finished with this booking.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }

    /// Returns true if `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        match next {
            BookingStatus::Pending => false,
            BookingStatus::Confirmed => self.can_confirm(),
            BookingStatus::Cancelled => self.can_compensate() || self.can_owner_cancel(),
        }
    }

    /// Returns the status name as stored and sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            _ => Err(BookingError::UnknownStatus(s.to_string())),
        }
    }
}
