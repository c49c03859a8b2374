//! Identifier types shared by every crate in the booking workspace.

mod types;

pub use types::{BookingId, HotelId, OwnerId, RequestId, RoomId};
