//! Idempotency ledger: request id → booking outcome.
//!
//! The ledger is a view over the booking store's unique request-id index
//! rather than a separate table, so "look up the key" and "record the key"
//! can never drift apart.

use async_trait::async_trait;
use domain::Booking;

use crate::{RequestId, Result, StoreError, store::BookingStore};

/// Outcome of claiming an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The key was unused; the given booking is now stored and owned by this caller.
    Fresh(Booking),
    /// The key was already taken; this is the existing booking, unchanged.
    Replay(Booking),
}

impl Claim {
    /// Returns the booking regardless of who created it.
    pub fn booking(&self) -> &Booking {
        match self {
            Claim::Fresh(b) | Claim::Replay(b) => b,
        }
    }

    /// Returns true if this caller created the booking.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Claim::Fresh(_))
    }
}

/// Extension trait providing idempotent booking creation over any store.
#[async_trait]
pub trait IdempotencyLedger: BookingStore {
    /// Looks up the booking recorded for a request id.
    async fn lookup(&self, request_id: &RequestId) -> Result<Option<Booking>> {
        self.find_by_request_id(request_id).await
    }

    /// Atomically records `booking` under its request id, or returns the
    /// booking that already holds the key.
    ///
    /// A fast-path lookup avoids an insert for plain retries; the insert's
    /// uniqueness guarantee settles races between concurrent callers.
    async fn claim(&self, booking: Booking) -> Result<Claim> {
        if let Some(existing) = self.lookup(&booking.request_id).await? {
            return Ok(Claim::Replay(existing));
        }

        match self.insert(booking).await {
            Ok(saved) => Ok(Claim::Fresh(saved)),
            Err(StoreError::DuplicateRequest(request_id)) => {
                tracing::debug!(%request_id, "lost idempotency race, replaying winner");
                let winner = self
                    .lookup(&request_id)
                    .await?
                    .ok_or(StoreError::DuplicateRequest(request_id))?;
                Ok(Claim::Replay(winner))
            }
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation for all BookingStore implementations
impl<T: BookingStore + ?Sized> IdempotencyLedger for T {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use common::{OwnerId, RoomId};
    use domain::{BookingRequest, DateRange, GuestCount};

    use super::*;
    use crate::InMemoryBookingStore;

    fn booking(request_id: &str) -> Booking {
        let dates = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        )
        .unwrap();
        let req = BookingRequest::new(RoomId::new(101), dates, GuestCount::new(2).unwrap());
        Booking::pending(&req, OwnerId::new(1), RequestId::from(request_id))
    }

    #[tokio::test]
    async fn test_claim_fresh_then_replay() {
        let store = InMemoryBookingStore::new();

        let first = store.claim(booking("abc")).await.unwrap();
        assert!(first.is_fresh());

        let second = store.claim(booking("abc")).await.unwrap();
        assert!(!second.is_fresh());
        assert_eq!(second.booking().id, first.booking().id);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_unknown_key() {
        let store = InMemoryBookingStore::new();
        assert!(store.lookup(&RequestId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_have_single_winner() {
        let store = Arc::new(InMemoryBookingStore::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.claim(booking("race")).await.unwrap()
            }));
        }

        let mut claims = Vec::new();
        for h in handles {
            claims.push(h.await.unwrap());
        }

        assert_eq!(claims.iter().filter(|c| c.is_fresh()).count(), 1);
        let winner = claims[0].booking().id;
        assert!(claims.iter().all(|c| c.booking().id == winner));
        assert_eq!(store.booking_count().await, 1);
    }
}
