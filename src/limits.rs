// ── Booking policy ───────────────────────────────────────────────

/// How long a PENDING reservation holds its slot before it expires.
pub const HOLD_WINDOW_SECS: i64 = 10 * 60;

/// Shortest bookable duration.
pub const MIN_BOOKING_SECS: i64 = 60;

// ── Availability policy ──────────────────────────────────────────

/// Number of days covered by the weekly view, starting tomorrow.
pub const AVAILABILITY_DAYS: i64 = 7;

/// A day with at most this many bookings is GREEN.
pub const GREEN_MAX_BOOKINGS: u32 = 2;

/// A day with at most this many bookings (and more than GREEN) is YELLOW.
pub const YELLOW_MAX_BOOKINGS: u32 = 5;

// ── Input limits ─────────────────────────────────────────────────

pub const MAX_NOTES_LEN: usize = 2000;
pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

// ── Expiry sweeper ───────────────────────────────────────────────

/// Attempts per reservation per sweep before leaving it for the next sweep.
pub const EXPIRE_RETRY_ATTEMPTS: u32 = 3;

/// First retry delay; doubles on every further attempt.
pub const EXPIRE_RETRY_BASE_MS: u64 = 100;
