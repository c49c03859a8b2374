//! Lifecycle tests for booking records.

use chrono::NaiveDate;
use common::{HotelId, OwnerId, RequestId, RoomId};
use domain::{
    Booking, BookingError, BookingRequest, BookingStatus, DateRange, GuestCount, StatusChange,
};

fn sample_request() -> BookingRequest {
    let dates = DateRange::new(
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
    )
    .unwrap();
    BookingRequest::new(RoomId::new(101), dates, GuestCount::new(2).unwrap())
        .with_request_id("abc")
}

#[test]
fn test_confirm_then_owner_cancel() {
    let req = sample_request();
    let mut booking = Booking::pending(&req, OwnerId::new(9), req.effective_request_id());

    booking
        .apply(&StatusChange::confirm(Some(HotelId::new(3))))
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    booking.apply(&StatusChange::owner_cancel()).unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.hotel_id, Some(HotelId::new(3)));
}

#[test]
fn test_compensated_booking_cannot_be_confirmed_or_cancelled_again() {
    let req = sample_request();
    let mut booking = Booking::pending(&req, OwnerId::new(9), RequestId::from("abc"));
    booking.apply(&StatusChange::compensate()).unwrap();

    assert!(matches!(
        booking.apply(&StatusChange::confirm(None)),
        Err(BookingError::StatusMismatch { .. })
    ));
    assert!(matches!(
        booking.apply(&StatusChange::owner_cancel()),
        Err(BookingError::StatusMismatch { .. })
    ));
    assert_eq!(booking.status, BookingStatus::Cancelled);
}

#[test]
fn test_booking_json_shape() {
    let req = sample_request();
    let booking = Booking::pending(&req, OwnerId::new(9), RequestId::from("abc"));
    let json = serde_json::to_value(&booking).unwrap();

    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["room_id"], 101);
    assert_eq!(json["request_id"], "abc");
    assert_eq!(json["dates"]["start_date"], "2025-06-01");
    assert_eq!(json["guest_count"], 2);
    assert!(json["hotel_id"].is_null());

    let back: Booking = serde_json::from_value(json).unwrap();
    assert_eq!(back, booking);
}
