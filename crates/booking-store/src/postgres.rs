use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{HotelId, OwnerId, RoomId};
use domain::{Booking, BookingStatus, DateRange, GuestCount, Money, StatusChange};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{BookingId, RequestId, Result, StoreError, store::BookingStore};

/// Name of the unique constraint guarding the idempotency key.
const REQUEST_ID_CONSTRAINT: &str = "unique_booking_request_id";

const SELECT_COLUMNS: &str = "SELECT id, owner_id, room_id, hotel_id, start_date, end_date, \
     guest_count, notes, status, total_price_cents, request_id, created_at, updated_at \
     FROM bookings";

/// PostgreSQL-backed booking store implementation.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new PostgreSQL booking store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a pool of up to `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let status: String = row.try_get("status")?;
        let guest_count: i16 = row.try_get("guest_count")?;
        let guest_count = u8::try_from(guest_count).unwrap_or(0);

        Ok(Booking {
            id: BookingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: OwnerId::new(row.try_get("owner_id")?),
            room_id: RoomId::new(row.try_get("room_id")?),
            hotel_id: row.try_get::<Option<i64>, _>("hotel_id")?.map(HotelId::new),
            dates: DateRange::new(
                row.try_get::<NaiveDate, _>("start_date")?,
                row.try_get::<NaiveDate, _>("end_date")?,
            )?,
            guest_count: GuestCount::new(guest_count)?,
            notes: row.try_get("notes")?,
            status: status.parse()?,
            total_price: row
                .try_get::<Option<i64>, _>("total_price_cents")?
                .map(Money::from_cents),
            request_id: RequestId::new(row.try_get::<String, _>("request_id")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn insert(&self, booking: Booking) -> Result<Booking> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, owner_id, room_id, hotel_id, start_date, end_date,
                                  guest_count, notes, status, total_price_cents, request_id,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.owner_id.get())
        .bind(booking.room_id.get())
        .bind(booking.hotel_id.map(|h| h.get()))
        .bind(booking.dates.start())
        .bind(booking.dates.end())
        .bind(i16::from(booking.guest_count.get()))
        .bind(&booking.notes)
        .bind(booking.status.as_str())
        .bind(booking.total_price.map(|m| m.cents()))
        .bind(booking.request_id.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(REQUEST_ID_CONSTRAINT)
            {
                return StoreError::DuplicateRequest(booking.request_id.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(booking)
    }

    async fn update_status(&self, id: BookingId, change: StatusChange) -> Result<Booking> {
        change.validate().map_err(StoreError::InvalidChange)?;

        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $3,
                hotel_id = COALESCE($4, hotel_id),
                updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING id, owner_id, room_id, hotel_id, start_date, end_date, guest_count, notes,
                      status, total_price_cents, request_id, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(change.from.as_str())
        .bind(change.to.as_str())
        .bind(change.hotel_id.map(|h| h.get()))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_booking(row);
        }

        // Nothing matched: either the row is gone or its status moved on.
        let actual: Option<String> =
            sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match actual {
            Some(actual) => Err(StoreError::StatusConflict {
                booking_id: id,
                expected: change.from,
                actual: actual.parse::<BookingStatus>()?,
            }),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn find_by_request_id(&self, request_id: &RequestId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE request_id = $1"))
            .bind(request_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE status = 'PENDING' AND created_at < $1 ORDER BY created_at ASC"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    async fn find_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    async fn find_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE status = $1 ORDER BY created_at DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    async fn find_all(&self) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }
}
