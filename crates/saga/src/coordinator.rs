//! Saga coordinator for the booking creation saga.

use booking_store::{BookingStore, Claim, IdempotencyLedger, StoreError};
use common::{BookingId, OwnerId};
use domain::{Booking, BookingRequest, BookingStatus, StatusChange};
use tokio_util::sync::CancellationToken;
use tracing::field::display;

use crate::booking_creation;
use crate::error::{InventoryError, Result, SagaError};
use crate::retry::RetryPolicy;
use crate::services::inventory::{AvailabilityRequest, InventoryClient};
use crate::state::SagaState;

/// Orchestrates booking creation against a remote room inventory.
///
/// Each run writes a PENDING booking, asks inventory to hold the room,
/// and then either confirms the booking or cancels it and releases the
/// hold. Duplicate requests (same request id) replay the stored booking
/// without touching inventory.
pub struct BookingSaga<S, I>
where
    S: BookingStore,
    I: InventoryClient,
{
    store: S,
    inventory: I,
    retry: RetryPolicy,
}

impl<S, I> BookingSaga<S, I>
where
    S: BookingStore,
    I: InventoryClient,
{
    /// Creates a new saga with the default retry policy.
    pub fn new(store: S, inventory: I) -> Self {
        Self {
            store,
            inventory,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy used for confirm-availability.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the booking store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the inventory client.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Returns the retry policy in use.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Creates a booking, running the saga to completion.
    pub async fn create_booking(
        &self,
        request: BookingRequest,
        owner_id: OwnerId,
    ) -> Result<Booking> {
        self.create_booking_with_cancel(request, owner_id, &CancellationToken::new())
            .await
    }

    /// Creates a booking; `cancel` aborts the wait on inventory.
    ///
    /// A cancelled run returns [`SagaError::Cancelled`] and leaves the
    /// booking PENDING for the janitor.
    #[tracing::instrument(
        skip_all,
        fields(
            saga_type = booking_creation::SAGA_TYPE,
            room_id = %request.room_id,
            %owner_id,
            request_id = tracing::field::Empty,
            booking_id = tracing::field::Empty,
        )
    )]
    pub async fn create_booking_with_cancel(
        &self,
        request: BookingRequest,
        owner_id: OwnerId,
        cancel: &CancellationToken,
    ) -> Result<Booking> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let request_id = request.effective_request_id();
        let span = tracing::Span::current();
        span.record("request_id", display(&request_id));

        let pending = Booking::pending(&request, owner_id, request_id);
        let booking = match self.store.claim(pending).await? {
            Claim::Replay(existing) => {
                metrics::counter!("saga_replayed_total").increment(1);
                if existing.status.is_terminal() {
                    tracing::info!(
                        booking_id = %existing.id,
                        status = %existing.status,
                        "duplicate request, returning existing booking"
                    );
                } else {
                    tracing::warn!(
                        booking_id = %existing.id,
                        "duplicate request while the first saga is still in flight"
                    );
                }
                return Ok(existing);
            }
            Claim::Fresh(booking) => booking,
        };
        span.record("booking_id", display(booking.id));

        let result = self.reserve(booking, cancel).await;
        metrics::histogram!("saga_duration_seconds").record(saga_start.elapsed().as_secs_f64());
        result
    }

    /// Drives a freshly claimed PENDING booking to a terminal state.
    async fn reserve(&self, booking: Booking, cancel: &CancellationToken) -> Result<Booking> {
        let state = SagaState::Start.advance(SagaState::Reserving)?;

        let availability = AvailabilityRequest {
            room_id: booking.room_id,
            dates: booking.dates,
            request_id: booking.request_id.clone(),
        };

        tracing::info!(
            step = booking_creation::STEP_CONFIRM_AVAILABILITY,
            "saga step started"
        );
        let outcome = self
            .retry
            .run(cancel, |attempt| {
                metrics::counter!("inventory_confirm_attempts_total").increment(1);
                tracing::debug!(attempt, "confirming availability");
                self.inventory.confirm_availability(&availability)
            })
            .await;

        match outcome {
            Ok(outcome) if outcome.available => {
                let state = state.advance(SagaState::Committing)?;
                let confirmed = match self
                    .write_terminal(booking.id, StatusChange::confirm(outcome.hotel_id))
                    .await
                {
                    Ok(Some(confirmed)) => confirmed,
                    Ok(None) => self.load(booking.id).await?,
                    Err(e @ SagaError::StorageConflict { .. }) => {
                        // Cancelled elsewhere while inventory was placing the hold.
                        tracing::warn!(
                            error = %e,
                            "booking resolved before commit, releasing hold"
                        );
                        self.release_hold(&booking).await;
                        return Err(e);
                    }
                    Err(e) => return Err(e),
                };
                state.advance(SagaState::DoneConfirmed)?;

                metrics::counter!("saga_confirmed_total").increment(1);
                tracing::info!(hotel_id = ?confirmed.hotel_id, "booking confirmed");
                Ok(confirmed)
            }
            Ok(outcome) => {
                let state = state.advance(SagaState::Compensating)?;
                tracing::info!(reason = %outcome.reason, "room unavailable, compensating");
                self.compensate(&booking).await?;
                state.advance(SagaState::DoneCancelled)?;

                metrics::counter!("saga_cancelled_total").increment(1);
                Err(SagaError::RoomUnavailable {
                    booking_id: booking.id,
                    reason: outcome.reason,
                })
            }
            Err(InventoryError::Cancelled) => {
                tracing::warn!(
                    %state,
                    "saga cancelled before inventory answered, booking left pending"
                );
                Err(SagaError::Cancelled {
                    booking_id: booking.id,
                })
            }
            Err(cause) => {
                let state = state.advance(SagaState::Compensating)?;
                tracing::error!(
                    error = %cause,
                    attempts = self.retry.max_attempts,
                    "inventory unreachable, compensating"
                );
                self.compensate(&booking).await?;
                state.advance(SagaState::DoneCancelled)?;

                metrics::counter!("saga_cancelled_total").increment(1);
                Err(SagaError::InventoryUnreachable {
                    booking_id: booking.id,
                    cause,
                })
            }
        }
    }

    /// Cancels a PENDING booking and releases its inventory hold.
    ///
    /// Returns `None` when the booking was already cancelled by someone
    /// else; in that case no release is sent. A confirmed booking yields
    /// [`SagaError::StorageConflict`].
    #[tracing::instrument(
        skip(self, booking),
        fields(booking_id = %booking.id, request_id = %booking.request_id)
    )]
    pub(crate) async fn compensate(&self, booking: &Booking) -> Result<Option<Booking>> {
        let Some(cancelled) = self
            .write_terminal(booking.id, StatusChange::compensate())
            .await?
        else {
            tracing::debug!("booking already cancelled, skipping release");
            return Ok(None);
        };

        self.release_hold(&cancelled).await;
        tracing::warn!("booking cancelled by compensation");
        Ok(Some(cancelled))
    }

    /// Best-effort release; failures are logged and counted, never returned.
    async fn release_hold(&self, booking: &Booking) {
        tracing::info!(step = booking_creation::STEP_RELEASE_HOLD, "saga step started");
        if let Err(e) = self
            .inventory
            .release(booking.room_id, &booking.request_id)
            .await
        {
            metrics::counter!("saga_compensation_failed_total").increment(1);
            tracing::error!(
                booking_id = %booking.id,
                room_id = %booking.room_id,
                error = %e,
                "failed to release inventory hold"
            );
        }
    }

    /// CAS write that treats "already in the target status" as a lost race.
    async fn write_terminal(&self, id: BookingId, change: StatusChange) -> Result<Option<Booking>> {
        match self.store.update_status(id, change).await {
            Ok(booking) => Ok(Some(booking)),
            Err(StoreError::StatusConflict { actual, .. }) if actual == change.to => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, id: BookingId) -> Result<Booking> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(SagaError::BookingNotFound(id))
    }

    /// Cancels a confirmed booking on behalf of its owner and releases the room.
    #[tracing::instrument(skip_all, fields(%booking_id, %owner_id))]
    pub async fn cancel_booking(
        &self,
        booking_id: BookingId,
        owner_id: OwnerId,
    ) -> Result<Booking> {
        let booking = self.get_booking(booking_id, owner_id).await?;
        if !booking.status.can_owner_cancel() {
            return Err(SagaError::InvalidTransition {
                booking_id,
                status: booking.status,
            });
        }

        let cancelled = match self
            .store
            .update_status(booking_id, StatusChange::owner_cancel())
            .await
        {
            Ok(cancelled) => cancelled,
            Err(StoreError::StatusConflict { actual, .. }) => {
                return Err(SagaError::InvalidTransition {
                    booking_id,
                    status: actual,
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.release_hold(&cancelled).await;
        tracing::info!("booking cancelled by owner");
        Ok(cancelled)
    }

    /// Loads a booking owned by `owner_id`.
    pub async fn get_booking(&self, booking_id: BookingId, owner_id: OwnerId) -> Result<Booking> {
        self.store
            .find_by_id(booking_id)
            .await?
            .filter(|b| b.owner_id == owner_id)
            .ok_or(SagaError::BookingNotFound(booking_id))
    }

    /// Lists an owner's bookings, newest first.
    pub async fn list_owner_bookings(&self, owner_id: OwnerId) -> Result<Vec<Booking>> {
        Ok(self.store.find_by_owner(owner_id).await?)
    }

    /// Lists all bookings in `status`, newest first.
    pub async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        Ok(self.store.find_by_status(status).await?)
    }

    /// Lists every booking, newest first.
    pub async fn list_all(&self) -> Result<Vec<Booking>> {
        Ok(self.store.find_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use booking_store::InMemoryBookingStore;
    use chrono::NaiveDate;
    use common::{HotelId, RequestId, RoomId};
    use domain::{DateRange, GuestCount};

    use super::*;
    use crate::services::inventory::{AvailabilityOutcome, InMemoryInventory};

    type TestSaga = BookingSaga<InMemoryBookingStore, InMemoryInventory>;

    fn setup() -> (TestSaga, InMemoryBookingStore, InMemoryInventory) {
        let store = InMemoryBookingStore::new();
        let inventory = InMemoryInventory::new();
        let saga = BookingSaga::new(store.clone(), inventory.clone());
        (saga, store, inventory)
    }

    fn request(request_id: &str) -> BookingRequest {
        let dates = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        )
        .unwrap();
        BookingRequest::new(RoomId::new(101), dates, GuestCount::new(2).unwrap())
            .with_request_id(request_id)
    }

    fn owner() -> OwnerId {
        OwnerId::new(1)
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (saga, store, inventory) = setup();
        inventory.set_hotel(RoomId::new(101), HotelId::new(7));

        let booking = saga.create_booking(request("abc"), owner()).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.hotel_id, Some(HotelId::new(7)));
        assert_eq!(booking.request_id.as_str(), "abc");
        assert!(booking.updated_at >= booking.created_at);
        assert_eq!(inventory.confirm_calls(), 1);
        assert_eq!(inventory.release_calls(), 0);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_request_id_is_minted() {
        let (saga, store, _) = setup();
        let mut req = request("unused");
        req.request_id = None;

        let booking = saga.create_booking(req, owner()).await.unwrap();

        assert_eq!(booking.request_id.as_str().len(), 36);
        let stored = store
            .find_by_request_id(&booking.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, booking.id);
    }

    #[tokio::test]
    async fn test_replay_returns_same_booking_without_inventory_calls() {
        let (saga, store, inventory) = setup();

        let first = saga.create_booking(request("abc"), owner()).await.unwrap();
        let second = saga.create_booking(request("abc"), owner()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inventory.confirm_calls(), 1);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_room_unavailable_compensates() {
        let (saga, store, inventory) = setup();
        inventory.set_unavailable(
            RoomId::new(101),
            "Room is already booked for the selected dates",
        );

        let result = saga.create_booking(request("abc"), owner()).await;

        let booking_id = match result {
            Err(SagaError::RoomUnavailable { booking_id, reason }) => {
                assert_eq!(reason, "Room is already booked for the selected dates");
                booking_id
            }
            other => panic!("expected RoomUnavailable, got {other:?}"),
        };
        let stored = store.find_by_id(booking_id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(inventory.releases_for(&RequestId::from("abc")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let (saga, _, inventory) = setup();
        inventory.fail_next_confirms(2);

        let booking = saga.create_booking(request("abc"), owner()).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(inventory.confirm_calls(), 3);
        assert_eq!(inventory.release_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_failure_does_not_change_outcome() {
        let (saga, store, inventory) = setup();
        inventory.set_fail_confirms(true);
        inventory.set_fail_release(true);

        let result = saga.create_booking(request("abc"), owner()).await;

        let Err(SagaError::InventoryUnreachable { booking_id, cause }) = result else {
            panic!("expected InventoryUnreachable");
        };
        assert!(matches!(cause, InventoryError::Transport(_)));
        let stored = store.find_by_id(booking_id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(inventory.release_calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_retry_policy() {
        let (saga, _, inventory) = setup();
        let saga = saga.with_retry_policy(RetryPolicy::new(1, Duration::ZERO));
        inventory.set_fail_confirms(true);

        let result = saga.create_booking(request("abc"), owner()).await;
        assert!(matches!(result, Err(SagaError::InventoryUnreachable { .. })));
        assert_eq!(inventory.confirm_calls(), 1);
    }

    #[tokio::test]
    async fn test_compensate_is_noop_when_already_cancelled() {
        let (saga, store, inventory) = setup();
        let pending = Booking::pending(&request("abc"), owner(), RequestId::from("abc"));
        let pending = store.insert(pending).await.unwrap();

        assert!(saga.compensate(&pending).await.unwrap().is_some());
        assert!(saga.compensate(&pending).await.unwrap().is_none());
        assert_eq!(inventory.release_calls(), 1);
    }

    #[tokio::test]
    async fn test_compensate_refuses_confirmed_booking() {
        let (saga, _, _) = setup();
        let confirmed = saga.create_booking(request("abc"), owner()).await.unwrap();

        let result = saga.compensate(&confirmed).await;
        assert!(matches!(
            result,
            Err(SagaError::StorageConflict {
                expected: BookingStatus::Pending,
                actual: BookingStatus::Confirmed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_owner_cancellation() {
        let (saga, _, inventory) = setup();
        let booking = saga.create_booking(request("abc"), owner()).await.unwrap();

        let cancelled = saga.cancel_booking(booking.id, owner()).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(inventory.releases_for(&RequestId::from("abc")), 1);
        assert!(!inventory.has_hold(&RequestId::from("abc")));

        let again = saga.cancel_booking(booking.id, owner()).await;
        assert!(matches!(
            again,
            Err(SagaError::InvalidTransition {
                status: BookingStatus::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let (saga, _, _) = setup();
        let booking = saga.create_booking(request("abc"), owner()).await.unwrap();
        let stranger = OwnerId::new(2);

        assert!(matches!(
            saga.get_booking(booking.id, stranger).await,
            Err(SagaError::BookingNotFound(_))
        ));
        assert!(matches!(
            saga.cancel_booking(booking.id, stranger).await,
            Err(SagaError::BookingNotFound(_))
        ));
        assert_eq!(saga.get_booking(booking.id, owner()).await.unwrap().id, booking.id);
        assert!(saga.list_owner_bookings(stranger).await.unwrap().is_empty());
        assert_eq!(saga.list_owner_bookings(owner()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let (saga, _, inventory) = setup();
        saga.create_booking(request("a"), owner()).await.unwrap();
        inventory.set_unavailable(RoomId::new(101), "closed");
        let _ = saga.create_booking(request("b"), owner()).await;

        assert_eq!(
            saga.list_by_status(BookingStatus::Confirmed).await.unwrap().len(),
            1
        );
        assert_eq!(
            saga.list_by_status(BookingStatus::Cancelled).await.unwrap().len(),
            1
        );
        assert!(saga.list_by_status(BookingStatus::Pending).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all() {
        let (saga, _, inventory) = setup();
        saga.create_booking(request("a"), owner()).await.unwrap();
        inventory.set_unavailable(RoomId::new(101), "closed");
        let _ = saga.create_booking(request("b"), owner()).await;

        assert_eq!(saga.list_all().await.unwrap().len(), 2);
    }

    /// Cancels the booking behind the saga's back while the hold is placed.
    struct CancelledDuringConfirm {
        store: InMemoryBookingStore,
        inner: InMemoryInventory,
    }

    #[async_trait::async_trait]
    impl InventoryClient for CancelledDuringConfirm {
        async fn confirm_availability(
            &self,
            request: &AvailabilityRequest,
        ) -> std::result::Result<AvailabilityOutcome, InventoryError> {
            let booking = self
                .store
                .find_by_request_id(&request.request_id)
                .await
                .unwrap()
                .unwrap();
            self.store
                .update_status(booking.id, StatusChange::compensate())
                .await
                .unwrap();
            self.inner.confirm_availability(request).await
        }

        async fn release(
            &self,
            room_id: RoomId,
            request_id: &RequestId,
        ) -> std::result::Result<(), InventoryError> {
            self.inner.release(room_id, request_id).await
        }
    }

    #[tokio::test]
    async fn test_commit_conflict_releases_hold() {
        let store = InMemoryBookingStore::new();
        let inner = InMemoryInventory::new();
        let saga = BookingSaga::new(
            store.clone(),
            CancelledDuringConfirm {
                store: store.clone(),
                inner: inner.clone(),
            },
        );

        let result = saga.create_booking(request("abc"), owner()).await;

        assert!(matches!(
            result,
            Err(SagaError::StorageConflict {
                actual: BookingStatus::Cancelled,
                ..
            })
        ));
        assert_eq!(inner.releases_for(&RequestId::from("abc")), 1);
        assert_eq!(inner.hold_count(), 0);
    }
}
