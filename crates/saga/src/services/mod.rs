//! Inventory clients used by the booking saga.

pub mod http;
pub mod inventory;

pub use http::HttpInventoryClient;
pub use inventory::{
    AvailabilityOutcome, AvailabilityRequest, InMemoryInventory, InventoryClient,
    ROOM_ALREADY_BOOKED,
};
