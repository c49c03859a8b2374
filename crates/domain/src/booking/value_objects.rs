//! Value objects for the booking domain.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::BookingError;

/// A stay, from check-in date (inclusive) to check-out date (exclusive).
///
/// Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateRangeParts")]
pub struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Deserialize)]
struct DateRangeParts {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<DateRangeParts> for DateRange {
    type Error = BookingError;

    fn try_from(parts: DateRangeParts) -> Result<Self, Self::Error> {
        DateRange::new(parts.start_date, parts.end_date)
    }
}

impl DateRange {
    /// Creates a date range, rejecting empty or inverted ranges.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::InvalidDateRange { start, end });
        }
        Ok(Self {
            start_date: start,
            end_date: end,
        })
    }

    /// Returns the check-in date.
    pub fn start(&self) -> NaiveDate {
        self.start_date
    }

    /// Returns the check-out date.
    pub fn end(&self) -> NaiveDate {
        self.end_date
    }

    /// Number of nights covered by the stay.
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Returns true if the two stays share at least one night.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start_date < other.end_date && other.start_date < self.end_date
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start_date, self.end_date)
    }
}

/// Number of guests on a booking, between 1 and 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GuestCount(u8);

impl GuestCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Creates a guest count within `MIN..=MAX`.
    pub fn new(count: u8) -> Result<Self, BookingError> {
        if !(Self::MIN..=Self::MAX).contains(&count) {
            return Err(BookingError::InvalidGuestCount { count });
        }
        Ok(Self(count))
    }

    /// Returns the number of guests.
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for GuestCount {
    type Error = BookingError;

    fn try_from(count: u8) -> Result<Self, Self::Error> {
        GuestCount::new(count)
    }
}

impl From<GuestCount> for u8 {
    fn from(count: GuestCount) -> Self {
        count.0
    }
}

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}
