pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{BookingId, RequestId};
pub use error::{Result, StoreError};
pub use ledger::{Claim, IdempotencyLedger};
pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;
pub use store::BookingStore;
