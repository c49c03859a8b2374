//! Domain layer for the booking saga platform.
//!
//! This crate provides the booking record and its invariants:
//! - `BookingStatus` state machine (PENDING → CONFIRMED | CANCELLED)
//! - `StatusChange` describing compare-and-swap status writes
//! - value objects (`DateRange`, `GuestCount`, `Money`)

pub mod booking;

pub use booking::{
    Booking, BookingError, BookingRequest, BookingStatus, DateRange, GuestCount, Money,
    StatusChange,
};
