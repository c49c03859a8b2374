use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OwnerId;
use domain::{Booking, BookingError, BookingStatus, StatusChange};
use tokio::sync::RwLock;

use crate::{BookingId, RequestId, Result, StoreError, store::BookingStore};

#[derive(Default)]
struct Tables {
    bookings: HashMap<BookingId, Booking>,
    by_request: HashMap<RequestId, BookingId>,
}

/// In-memory booking store implementation for testing and single-node runs.
///
/// The request-id index is checked and written under one write lock, which
/// gives the same exclusivity as the unique constraint in PostgreSQL.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryBookingStore {
    /// Creates a new empty in-memory booking store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of bookings stored.
    pub async fn booking_count(&self) -> usize {
        self.tables.read().await.bookings.len()
    }
}

fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> Result<Booking> {
        let mut tables = self.tables.write().await;

        if tables.by_request.contains_key(&booking.request_id) {
            return Err(StoreError::DuplicateRequest(booking.request_id));
        }

        tables
            .by_request
            .insert(booking.request_id.clone(), booking.id);
        tables.bookings.insert(booking.id, booking.clone());

        Ok(booking)
    }

    async fn update_status(&self, id: BookingId, change: StatusChange) -> Result<Booking> {
        let mut tables = self.tables.write().await;
        let booking = tables
            .bookings
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        booking.apply(&change).map_err(|e| match e {
            BookingError::StatusMismatch { expected, actual } => StoreError::StatusConflict {
                booking_id: id,
                expected,
                actual,
            },
            e @ BookingError::InvalidStateTransition { .. } => StoreError::InvalidChange(e),
            other => StoreError::Corrupt(other),
        })?;

        Ok(booking.clone())
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn find_by_request_id(&self, request_id: &RequestId) -> Result<Option<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_request
            .get(request_id)
            .and_then(|id| tables.bookings.get(id))
            .cloned())
    }

    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut stale: Vec<_> = tables
            .bookings
            .values()
            .filter(|b| b.is_stale(cutoff))
            .cloned()
            .collect();
        stale.sort_by_key(|b| b.created_at);
        Ok(stale)
    }

    async fn find_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .bookings
                .values()
                .filter(|b| b.owner_id == owner_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .bookings
                .values()
                .filter(|b| b.status == status)
                .cloned()
                .collect(),
        ))
    }

    async fn find_all(&self) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.bookings.values().cloned().collect()))
    }
}
