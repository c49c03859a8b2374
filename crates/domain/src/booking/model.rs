//! Booking records and the requests that create them.

use chrono::{DateTime, Utc};
use common::{BookingId, HotelId, OwnerId, RequestId, RoomId};
use serde::{Deserialize, Serialize};

use super::{BookingError, BookingStatus, DateRange, GuestCount, Money};

/// A caller's request to book a room. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub room_id: RoomId,
    pub dates: DateRange,
    pub guest_count: GuestCount,
    pub notes: Option<String>,
    /// Idempotency key. A fresh one is minted when absent.
    pub request_id: Option<RequestId>,
}

impl BookingRequest {
    /// Creates a request without notes or idempotency key.
    pub fn new(room_id: RoomId, dates: DateRange, guest_count: GuestCount) -> Self {
        Self {
            room_id,
            dates,
            guest_count,
            notes: None,
            request_id: None,
        }
    }

    /// Attaches freeform notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attaches a caller-supplied idempotency key.
    pub fn with_request_id(mut self, request_id: impl Into<RequestId>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Rejects a caller-supplied key longer than [`RequestId::MAX_LEN`].
    pub fn validate(&self) -> Result<(), BookingError> {
        if let Some(request_id) = &self.request_id {
            let len = request_id.as_str().chars().count();
            if len > RequestId::MAX_LEN {
                return Err(BookingError::RequestIdTooLong {
                    len,
                    max: RequestId::MAX_LEN,
                });
            }
        }
        Ok(())
    }

    /// Returns the caller's key, or mints a new one.
    pub fn effective_request_id(&self) -> RequestId {
        self.request_id.clone().unwrap_or_else(RequestId::generate)
    }
}

/// A durable booking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub owner_id: OwnerId,
    pub room_id: RoomId,
    /// Filled in from the inventory outcome once known.
    pub hotel_id: Option<HotelId>,
    pub dates: DateRange,
    pub guest_count: GuestCount,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub total_price: Option<Money>,
    pub request_id: RequestId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Builds the PENDING record written at saga start.
    pub fn pending(request: &BookingRequest, owner_id: OwnerId, request_id: RequestId) -> Self {
        let now = Utc::now();
        Self {
            id: BookingId::new(),
            owner_id,
            room_id: request.room_id,
            hotel_id: None,
            dates: request.dates,
            guest_count: request.guest_count,
            notes: request.notes.clone(),
            status: BookingStatus::Pending,
            total_price: None,
            request_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a status change if the record is still in the expected status.
    ///
    /// This is the in-memory half of the store's compare-and-swap write.
    pub fn apply(&mut self, change: &StatusChange) -> Result<(), BookingError> {
        change.validate()?;
        if self.status != change.from {
            return Err(BookingError::StatusMismatch {
                expected: change.from,
                actual: self.status,
            });
        }
        self.status = change.to;
        if let Some(hotel_id) = change.hotel_id {
            self.hotel_id = Some(hotel_id);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns true if this booking is still PENDING and was created before `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.created_at < cutoff
    }
}

/// A conditional status write: `from → to`, plus fields resolved along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub hotel_id: Option<HotelId>,
}

impl StatusChange {
    /// Rejects changes the status machine forbids.
    pub fn validate(&self) -> Result<(), BookingError> {
        if !self.from.can_transition_to(self.to) {
            return Err(BookingError::InvalidStateTransition {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }

    /// PENDING → CONFIRMED, recording the hotel echoed by inventory.
    pub fn confirm(hotel_id: Option<HotelId>) -> Self {
        Self {
            from: BookingStatus::Pending,
            to: BookingStatus::Confirmed,
            hotel_id,
        }
    }

    /// PENDING → CANCELLED (saga or janitor compensation).
    pub fn compensate() -> Self {
        Self {
            from: BookingStatus::Pending,
            to: BookingStatus::Cancelled,
            hotel_id: None,
        }
    }

    /// CONFIRMED → CANCELLED (owner-initiated).
    pub fn owner_cancel() -> Self {
        Self {
            from: BookingStatus::Confirmed,
            to: BookingStatus::Cancelled,
            hotel_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn request() -> BookingRequest {
        let dates = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        )
        .unwrap();
        BookingRequest::new(RoomId::new(101), dates, GuestCount::new(2).unwrap())
    }

    #[test]
    fn test_pending_booking_from_request() {
        let req = request().with_notes("late arrival");
        let booking = Booking::pending(&req, OwnerId::new(1), RequestId::from("abc"));

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.room_id, RoomId::new(101));
        assert_eq!(booking.hotel_id, None);
        assert_eq!(booking.total_price, None);
        assert_eq!(booking.notes.as_deref(), Some("late arrival"));
        assert_eq!(booking.request_id.as_str(), "abc");
        assert_eq!(booking.created_at, booking.updated_at);
    }

    #[test]
    fn test_effective_request_id() {
        let with_key = request().with_request_id("abc");
        assert_eq!(with_key.effective_request_id().as_str(), "abc");

        let without_key = request();
        assert_ne!(
            without_key.effective_request_id(),
            without_key.effective_request_id()
        );
    }

    #[test]
    fn test_request_id_length_limit() {
        assert!(request().validate().is_ok());
        assert!(
            request()
                .with_request_id("k".repeat(RequestId::MAX_LEN))
                .validate()
                .is_ok()
        );
        assert!(matches!(
            request()
                .with_request_id("k".repeat(RequestId::MAX_LEN + 1))
                .validate(),
            Err(BookingError::RequestIdTooLong { len: 101, max: 100 })
        ));
    }

    #[test]
    fn test_apply_confirm_records_hotel() {
        let mut booking = Booking::pending(&request(), OwnerId::new(1), RequestId::from("a"));
        booking
            .apply(&StatusChange::confirm(Some(HotelId::new(7))))
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.hotel_id, Some(HotelId::new(7)));
        assert!(booking.updated_at >= booking.created_at);
    }

    #[test]
    fn test_apply_rejects_stale_view() {
        let mut booking = Booking::pending(&request(), OwnerId::new(1), RequestId::from("a"));
        booking.apply(&StatusChange::compensate()).unwrap();

        let err = booking
            .apply(&StatusChange::confirm(None))
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::StatusMismatch {
                expected: BookingStatus::Pending,
                actual: BookingStatus::Cancelled,
            }
        ));
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_apply_rejects_forbidden_change() {
        let mut booking = Booking::pending(&request(), OwnerId::new(1), RequestId::from("a"));
        booking.apply(&StatusChange::compensate()).unwrap();

        let revive = StatusChange {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Confirmed,
            hotel_id: None,
        };
        assert!(matches!(
            booking.apply(&revive),
            Err(BookingError::InvalidStateTransition { .. })
        ));
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert!(StatusChange::confirm(None).validate().is_ok());
    }

    #[test]
    fn test_is_stale() {
        let mut booking = Booking::pending(&request(), OwnerId::new(1), RequestId::from("a"));
        booking.created_at = Utc::now() - Duration::hours(2);

        let cutoff = Utc::now() - Duration::hours(1);
        assert!(booking.is_stale(cutoff));

        booking.apply(&StatusChange::compensate()).unwrap();
        assert!(!booking.is_stale(cutoff));
    }
}
