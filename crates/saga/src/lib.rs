//! Saga pattern implementation for booking creation.
//!
//! The booking creation saga follows these steps:
//! 1. Claim the request id and write a PENDING booking
//! 2. Ask the inventory service to confirm and hold the room (bounded retry)
//! 3. Confirm the booking, or cancel it and release the hold
//!
//! A [`Janitor`] resolves bookings whose saga never reached step 3.

pub mod booking_creation;
pub mod coordinator;
pub mod error;
pub mod janitor;
pub mod retry;
pub mod services;
pub mod state;

pub use coordinator::BookingSaga;
pub use error::{InventoryError, SagaError};
pub use janitor::{Janitor, JanitorConfig};
pub use retry::RetryPolicy;
pub use services::{
    AvailabilityOutcome, AvailabilityRequest, HttpInventoryClient, InMemoryInventory,
    InventoryClient,
};
pub use state::SagaState;
pub use tokio_util::sync::CancellationToken;
