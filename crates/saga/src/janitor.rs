//! Stale-booking janitor.
//!
//! A saga that dies between writing its PENDING row and reaching a
//! terminal status leaves an orphan behind. The janitor periodically
//! cancels PENDING bookings older than a threshold through the saga's
//! own compensation path.

use std::sync::Arc;
use std::time::Duration;

use booking_store::BookingStore;
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::booking_creation;
use crate::coordinator::BookingSaga;
use crate::error::{Result, SagaError};
use crate::services::inventory::InventoryClient;

/// Janitor scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JanitorConfig {
    /// Pause between sweeps.
    pub interval: Duration,
    /// PENDING bookings created longer ago than this are reaped.
    pub stale_after: chrono::Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval: booking_creation::DEFAULT_JANITOR_INTERVAL,
            stale_after: chrono::Duration::seconds(
                booking_creation::DEFAULT_STALE_AFTER.as_secs() as i64,
            ),
        }
    }
}

/// Reaps orphaned PENDING bookings.
pub struct Janitor<S, I>
where
    S: BookingStore,
    I: InventoryClient,
{
    saga: Arc<BookingSaga<S, I>>,
    config: JanitorConfig,
}

impl<S, I> Janitor<S, I>
where
    S: BookingStore,
    I: InventoryClient,
{
    /// Creates a janitor that compensates through `saga`.
    pub fn new(saga: Arc<BookingSaga<S, I>>, config: JanitorConfig) -> Self {
        Self { saga, config }
    }

    /// Returns the janitor's configuration.
    pub fn config(&self) -> JanitorConfig {
        self.config
    }

    /// Runs one sweep and returns how many bookings it cancelled.
    ///
    /// Bookings resolved by their own saga in the meantime are skipped and
    /// not counted. A failure on one booking does not stop the sweep.
    #[tracing::instrument(skip(self))]
    pub async fn run_cleanup(&self) -> Result<usize> {
        let cutoff = Utc::now()
            .checked_sub_signed(self.config.stale_after)
            .ok_or(SagaError::StaleCutoffOutOfRange {
                stale_after: self.config.stale_after,
            })?;
        let stale = self.saga.store().find_pending_older_than(cutoff).await?;

        if stale.is_empty() {
            tracing::debug!(%cutoff, "no stale bookings");
            return Ok(0);
        }
        tracing::info!(count = stale.len(), %cutoff, "reaping stale pending bookings");

        let mut reaped = 0;
        for booking in &stale {
            match self.saga.compensate(booking).await {
                Ok(Some(_)) => reaped += 1,
                Ok(None) => {
                    tracing::debug!(booking_id = %booking.id, "booking already cancelled");
                }
                Err(SagaError::StorageConflict { actual, .. }) => {
                    tracing::debug!(
                        booking_id = %booking.id,
                        %actual,
                        "booking resolved by its saga, skipping"
                    );
                }
                Err(e) => {
                    tracing::warn!(booking_id = %booking.id, error = %e, "failed to reap booking");
                }
            }
        }

        metrics::counter!("janitor_reaped_total").increment(reaped as u64);
        tracing::info!(reaped, "janitor sweep finished");
        Ok(reaped)
    }

    /// Sweeps every `interval` until `shutdown` is cancelled.
    ///
    /// The first sweep runs immediately. Periods shorter than
    /// [`booking_creation::MIN_JANITOR_INTERVAL`] are raised to it.
    pub async fn run(&self, shutdown: CancellationToken) {
        let period = self
            .config
            .interval
            .max(booking_creation::MIN_JANITOR_INTERVAL);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = period.as_secs(),
            stale_after_secs = self.config.stale_after.num_seconds(),
            "janitor started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cleanup().await {
                        tracing::error!(error = %e, "janitor sweep failed");
                    }
                }
            }
        }

        tracing::info!("janitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use booking_store::InMemoryBookingStore;
    use chrono::NaiveDate;
    use common::{OwnerId, RequestId, RoomId};
    use domain::{Booking, BookingRequest, BookingStatus, DateRange, GuestCount};

    use super::*;
    use crate::services::inventory::InMemoryInventory;

    fn setup() -> (
        Janitor<InMemoryBookingStore, InMemoryInventory>,
        InMemoryBookingStore,
        InMemoryInventory,
    ) {
        let store = InMemoryBookingStore::new();
        let inventory = InMemoryInventory::new();
        let saga = Arc::new(BookingSaga::new(store.clone(), inventory.clone()));
        (
            Janitor::new(saga, JanitorConfig::default()),
            store,
            inventory,
        )
    }

    fn pending(request_id: &str, age: chrono::Duration) -> Booking {
        let dates = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        )
        .unwrap();
        let req = BookingRequest::new(RoomId::new(101), dates, GuestCount::new(2).unwrap());
        let mut booking = Booking::pending(&req, OwnerId::new(1), RequestId::from(request_id));
        booking.created_at = Utc::now() - age;
        booking.updated_at = booking.created_at;
        booking
    }

    #[test]
    fn test_default_config() {
        let config = JanitorConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.stale_after, chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn test_reaps_only_stale_pending() {
        let (janitor, store, inventory) = setup();
        let stale = store
            .insert(pending("stale", chrono::Duration::hours(2)))
            .await
            .unwrap();
        let fresh = store
            .insert(pending("fresh", chrono::Duration::minutes(5)))
            .await
            .unwrap();

        assert_eq!(janitor.run_cleanup().await.unwrap(), 1);

        let stale = store.find_by_id(stale.id).await.unwrap().unwrap();
        let fresh = store.find_by_id(fresh.id).await.unwrap().unwrap();
        assert_eq!(stale.status, BookingStatus::Cancelled);
        assert_eq!(fresh.status, BookingStatus::Pending);
        assert_eq!(inventory.releases_for(&RequestId::from("stale")), 1);

        assert_eq!(janitor.run_cleanup().await.unwrap(), 0);
        assert_eq!(inventory.release_calls(), 1);
    }

    #[tokio::test]
    async fn test_release_failure_still_counts() {
        let (janitor, store, inventory) = setup();
        inventory.set_fail_release(true);
        store
            .insert(pending("a", chrono::Duration::hours(2)))
            .await
            .unwrap();
        store
            .insert(pending("b", chrono::Duration::hours(3)))
            .await
            .unwrap();

        assert_eq!(janitor.run_cleanup().await.unwrap(), 2);
        assert_eq!(inventory.release_calls(), 2);
        assert!(
            store
                .find_by_status(BookingStatus::Pending)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_unrepresentable_cutoff_is_an_error() {
        let store = InMemoryBookingStore::new();
        let saga = Arc::new(BookingSaga::new(store, InMemoryInventory::new()));
        let janitor = Janitor::new(
            saga,
            JanitorConfig {
                interval: Duration::from_secs(60),
                stale_after: chrono::Duration::seconds(1_000_000_000_000_000),
            },
        );

        let err = janitor.run_cleanup().await.unwrap_err();
        assert!(matches!(err, SagaError::StaleCutoffOutOfRange { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_zero_interval_uses_minimum() {
        let (_, store, inventory) = setup();
        let saga = Arc::new(BookingSaga::new(store.clone(), inventory));
        let janitor = Arc::new(Janitor::new(
            saga,
            JanitorConfig {
                interval: Duration::ZERO,
                stale_after: chrono::Duration::hours(1),
            },
        ));
        store
            .insert(pending("stale", chrono::Duration::hours(2)))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let janitor = janitor.clone();
            let shutdown = shutdown.clone();
            async move { janitor.run(shutdown).await }
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(
            store
                .find_by_status(BookingStatus::Cancelled)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (janitor, store, _) = setup();
        store
            .insert(pending("stale", chrono::Duration::hours(2)))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let janitor = Arc::new(janitor);
        let handle = tokio::spawn({
            let janitor = janitor.clone();
            let shutdown = shutdown.clone();
            async move { janitor.run(shutdown).await }
        });

        // Let the immediate first sweep run.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            store
                .find_by_status(BookingStatus::Cancelled)
                .await
                .unwrap()
                .len(),
            1
        );

        shutdown.cancel();
        handle.await.unwrap();
    }
}
