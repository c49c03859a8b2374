//! Inventory client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::{HotelId, RequestId, RoomId};
use domain::DateRange;
use tokio::time::Instant;

use crate::error::InventoryError;

/// Reason reported when another request already holds the room.
pub const ROOM_ALREADY_BOOKED: &str = "Room is already booked for the selected dates";

/// A request to confirm and hold a room for a stay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub room_id: RoomId,
    pub dates: DateRange,
    pub request_id: RequestId,
}

/// The inventory service's answer to an availability request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityOutcome {
    pub available: bool,
    /// Human-readable explanation, mostly useful when `available` is false.
    pub reason: String,
    pub request_id: RequestId,
    pub room_id: RoomId,
    pub hotel_id: Option<HotelId>,
}

impl AvailabilityOutcome {
    /// A positive outcome for `request`.
    pub fn available(request: &AvailabilityRequest, hotel_id: Option<HotelId>) -> Self {
        Self {
            available: true,
            reason: "Room is available".to_string(),
            request_id: request.request_id.clone(),
            room_id: request.room_id,
            hotel_id,
        }
    }

    /// A negative outcome for `request`.
    pub fn unavailable(request: &AvailabilityRequest, reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: reason.into(),
            request_id: request.request_id.clone(),
            room_id: request.room_id,
            hotel_id: None,
        }
    }
}

/// Remote room inventory.
///
/// Both operations must be safe to repeat for the same request id.
/// Implementations make a single attempt; retrying is the caller's concern.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Asks the inventory service to confirm the room is free and hold it.
    async fn confirm_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityOutcome, InventoryError>;

    /// Releases whatever hold `request_id` has on the room.
    async fn release(&self, room_id: RoomId, request_id: &RequestId) -> Result<(), InventoryError>;
}

#[derive(Debug, Clone)]
struct Hold {
    room_id: RoomId,
    dates: DateRange,
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    holds: HashMap<RequestId, Hold>,
    hotels: HashMap<RoomId, HotelId>,
    closed_rooms: HashMap<RoomId, String>,
    fail_next_confirms: u32,
    fail_confirms: bool,
    fail_release: bool,
    confirm_calls: Vec<Instant>,
    release_calls: Vec<(RoomId, RequestId)>,
}

/// In-memory inventory service for testing and local runs.
///
/// Models the hotel service's temporary blocks: a confirmed request holds
/// the room for its dates until released, and repeating a confirm for the
/// same request id answers from the existing hold.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    state: Arc<Mutex<InMemoryInventoryState>>,
}

impl InMemoryInventory {
    /// Creates a new in-memory inventory where every room is free.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryInventoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the hotel echoed back for a room.
    pub fn set_hotel(&self, room_id: RoomId, hotel_id: HotelId) {
        self.state().hotels.insert(room_id, hotel_id);
    }

    /// Makes every confirm for `room_id` answer unavailable with `reason`.
    pub fn set_unavailable(&self, room_id: RoomId, reason: impl Into<String>) {
        self.state().closed_rooms.insert(room_id, reason.into());
    }

    /// Fails the next `n` confirm calls with a transport error.
    pub fn fail_next_confirms(&self, n: u32) {
        self.state().fail_next_confirms = n;
    }

    /// Configures every confirm call to fail with a transport error.
    pub fn set_fail_confirms(&self, fail: bool) {
        self.state().fail_confirms = fail;
    }

    /// Configures release calls to fail.
    pub fn set_fail_release(&self, fail: bool) {
        self.state().fail_release = fail;
    }

    /// Returns the number of confirm calls received, failed ones included.
    pub fn confirm_calls(&self) -> usize {
        self.state().confirm_calls.len()
    }

    /// Returns when each confirm call arrived.
    pub fn confirm_call_times(&self) -> Vec<Instant> {
        self.state().confirm_calls.clone()
    }

    /// Returns the number of release calls received, failed ones included.
    pub fn release_calls(&self) -> usize {
        self.state().release_calls.len()
    }

    /// Returns the number of release calls made for `request_id`.
    pub fn releases_for(&self, request_id: &RequestId) -> usize {
        self.state()
            .release_calls
            .iter()
            .filter(|(_, r)| r == request_id)
            .count()
    }

    /// Returns the number of active holds.
    pub fn hold_count(&self) -> usize {
        self.state().holds.len()
    }

    /// Returns true if `request_id` currently holds a room.
    pub fn has_hold(&self, request_id: &RequestId) -> bool {
        self.state().holds.contains_key(request_id)
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn confirm_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityOutcome, InventoryError> {
        let mut state = self.state();
        state.confirm_calls.push(Instant::now());

        if state.fail_confirms {
            return Err(InventoryError::Transport("connection refused".to_string()));
        }
        if state.fail_next_confirms > 0 {
            state.fail_next_confirms -= 1;
            return Err(InventoryError::Transport("connection reset".to_string()));
        }

        let hotel_id = state.hotels.get(&request.room_id).copied();

        if state.holds.contains_key(&request.request_id) {
            return Ok(AvailabilityOutcome::available(request, hotel_id));
        }

        if let Some(reason) = state.closed_rooms.get(&request.room_id) {
            return Ok(AvailabilityOutcome::unavailable(request, reason.clone()));
        }

        let taken = state
            .holds
            .values()
            .any(|hold| hold.room_id == request.room_id && hold.dates.overlaps(&request.dates));
        if taken {
            return Ok(AvailabilityOutcome::unavailable(request, ROOM_ALREADY_BOOKED));
        }

        state.holds.insert(
            request.request_id.clone(),
            Hold {
                room_id: request.room_id,
                dates: request.dates,
            },
        );
        Ok(AvailabilityOutcome::available(request, hotel_id))
    }

    async fn release(&self, room_id: RoomId, request_id: &RequestId) -> Result<(), InventoryError> {
        let mut state = self.state();
        state.release_calls.push((room_id, request_id.clone()));

        if state.fail_release {
            return Err(InventoryError::Status {
                status: 503,
                body: "inventory unavailable".to_string(),
            });
        }

        state.holds.remove(request_id);
        Ok(())
    }
}
