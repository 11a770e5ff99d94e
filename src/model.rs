use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Naive local wall-clock time, the only time type. No timezone conversion
/// happens anywhere in the crate.
pub type Ts = NaiveDateTime;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ts,
    pub end: Ts,
}

impl Span {
    pub fn new(start: Ts, end: Ts) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ts) -> bool {
        self.start <= t && t < self.end
    }
}

/// Lifecycle of a reservation.
///
/// ```text
/// Pending ──► Confirmed ──► Completed
///    │            │
///    ├────────────┴──► Cancelled
///    └──► Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Completed,
}

impl BookingStatus {
    /// Pending and confirmed reservations occupy their slot.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
            BookingStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A claimed time range on a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub venue_id: Ulid,
    pub user_id: Ulid,
    pub start_time: Ts,
    pub end_time: Ts,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: Ts,
    pub updated_at: Ts,
    /// Hold deadline; `Some` only while the reservation is PENDING.
    pub hold_expires_at: Option<Ts>,
}

impl Reservation {
    pub fn span(&self) -> Span {
        Span::new(self.start_time, self.end_time)
    }
}

/// Input for a new booking, already authenticated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub venue_id: Ulid,
    pub user_id: Ulid,
    pub start: Ts,
    pub end: Ts,
    pub notes: Option<String>,
}

/// Who is asking. Admin status is decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(Ulid),
    Admin,
}

impl Actor {
    pub fn can_act_for(&self, owner: Ulid) -> bool {
        match self {
            Actor::User(id) => *id == owner,
            Actor::Admin => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    /// Effective limit, capped at `MAX_PAGE_LIMIT`.
    pub fn take(&self) -> usize {
        self.limit.min(MAX_PAGE_LIMIT)
    }
}

/// Active (pending or confirmed) claim on a venue's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub id: Ulid,
    pub span: Span,
}

/// All reservations of one venue plus the sorted timeline of active claims.
#[derive(Debug, Clone)]
pub struct VenueState {
    pub venue_id: Ulid,
    pub reservations: std::collections::HashMap<Ulid, Reservation>,
    /// Active claims, sorted by `span.start`. Never overlapping.
    pub claims: Vec<Claim>,
}

impl VenueState {
    pub fn new(venue_id: Ulid) -> Self {
        Self {
            venue_id,
            reservations: std::collections::HashMap::new(),
            claims: Vec::new(),
        }
    }

    /// Insert claim maintaining sort order by span.start.
    pub fn insert_claim(&mut self, claim: Claim) {
        let pos = self
            .claims
            .binary_search_by_key(&claim.span.start, |c| c.span.start)
            .unwrap_or_else(|e| e);
        self.claims.insert(pos, claim);
    }

    pub fn remove_claim(&mut self, id: Ulid) -> Option<Claim> {
        let pos = self.claims.iter().position(|c| c.id == id)?;
        Some(self.claims.remove(pos))
    }

    /// Return only claims whose span overlaps the query window.
    /// Uses binary search to skip claims starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Claim> {
        let right_bound = self.claims.partition_point(|c| c.span.start < query.end);
        self.claims[..right_bound]
            .iter()
            .filter(move |c| c.span.end > query.start)
    }

    /// Store a reservation. Active ones also claim their span.
    /// Returns the previous reservation with the same id, if any.
    pub fn insert_reservation(&mut self, reservation: Reservation) -> Option<Reservation> {
        let previous = self.reservations.remove(&reservation.id);
        if previous.is_some() {
            self.remove_claim(reservation.id);
        }
        if reservation.status.is_active() {
            self.insert_claim(Claim {
                id: reservation.id,
                span: reservation.span(),
            });
        }
        self.reservations.insert(reservation.id, reservation);
        previous
    }

    /// Move a reservation to `status`. The hold deadline is cleared and the
    /// claim released once the status is no longer active.
    pub fn set_status(&mut self, id: Ulid, status: BookingStatus, at: Ts) -> Option<&Reservation> {
        let r = self.reservations.get_mut(&id)?;
        r.status = status;
        r.updated_at = at;
        r.hold_expires_at = None;
        if !status.is_active() {
            self.claims.retain(|c| c.id != id);
        }
        self.reservations.get(&id)
    }

    pub fn active_reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values().filter(|r| r.status.is_active())
    }
}

/// Flat event records; this is the WAL format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        reservation: Reservation,
    },
    BookingConfirmed {
        id: Ulid,
        venue_id: Ulid,
        at: Ts,
    },
    BookingCancelled {
        id: Ulid,
        venue_id: Ulid,
        at: Ts,
    },
    BookingExpired {
        id: Ulid,
        venue_id: Ulid,
        at: Ts,
    },
    BookingCompleted {
        id: Ulid,
        venue_id: Ulid,
        at: Ts,
    },
}

impl Event {
    pub fn venue_id(&self) -> Ulid {
        match self {
            Event::BookingCreated { reservation } => reservation.venue_id,
            Event::BookingConfirmed { venue_id, .. }
            | Event::BookingCancelled { venue_id, .. }
            | Event::BookingExpired { venue_id, .. }
            | Event::BookingCompleted { venue_id, .. } => *venue_id,
        }
    }

    pub fn reservation_id(&self) -> Ulid {
        match self {
            Event::BookingCreated { reservation } => reservation.id,
            Event::BookingConfirmed { id, .. }
            | Event::BookingCancelled { id, .. }
            | Event::BookingExpired { id, .. }
            | Event::BookingCompleted { id, .. } => *id,
        }
    }

    /// Build the transition event that moves `id` into `status`.
    pub fn transition(id: Ulid, venue_id: Ulid, status: BookingStatus, at: Ts) -> Option<Event> {
        match status {
            BookingStatus::Confirmed => Some(Event::BookingConfirmed { id, venue_id, at }),
            BookingStatus::Cancelled => Some(Event::BookingCancelled { id, venue_id, at }),
            BookingStatus::Expired => Some(Event::BookingExpired { id, venue_id, at }),
            BookingStatus::Completed => Some(Event::BookingCompleted { id, venue_id, at }),
            BookingStatus::Pending => None,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// Daily booking pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityLevel {
    Green,
    Yellow,
    Red,
}

/// Whether a single hourly slot is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub weekday: String,
    pub status: AvailabilityLevel,
    pub booking_count: u32,
    pub available_slots: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyAvailability {
    pub venue_id: Ulid,
    pub venue_name: String,
    pub days: Vec<DayAvailability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlySlot {
    pub hour: NaiveTime,
    pub status: SlotStatus,
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyAvailability {
    pub venue_id: Ulid,
    pub venue_name: String,
    pub date: NaiveDate,
    pub slots: Vec<HourlySlot>,
    pub total_slots: u32,
    pub available_slots: u32,
}
