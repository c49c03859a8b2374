//! Booking creation saga constants.

use std::time::Duration;

/// The saga type identifier used in logs and spans.
pub const SAGA_TYPE: &str = "BookingCreation";

/// Step name: ask inventory to confirm and hold the room.
pub const STEP_CONFIRM_AVAILABILITY: &str = "confirm_availability";

/// Step name: release an inventory hold (compensation).
pub const STEP_RELEASE_HOLD: &str = "release_hold";

/// Attempts made at confirm-availability before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed pause between confirm-availability attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Age after which a PENDING booking is considered orphaned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// How often the janitor sweeps for orphaned bookings.
pub const DEFAULT_JANITOR_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Shortest janitor sweep period accepted.
pub const MIN_JANITOR_INTERVAL: Duration = Duration::from_secs(1);

/// Longest stale-after threshold accepted (ten years).
pub const MAX_STALE_AFTER: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);
