use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::SharedVenueState;

/// Per-venue reservation state plus the lookup indexes the engine needs.
pub struct InMemoryStore {
    venues: DashMap<Ulid, SharedVenueState>,
    reservation_to_venue: DashMap<Ulid, Ulid>,
    /// User → reservation ids, in creation order.
    by_user: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            venues: DashMap::new(),
            reservation_to_venue: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    // ── Venue state ──────────────────────────────────────────

    pub fn venue_count(&self) -> usize {
        self.venues.len()
    }

    pub fn get_venue(&self, id: &Ulid) -> Option<SharedVenueState> {
        self.venues.get(id).map(|e| e.value().clone())
    }

    /// Venue state is created lazily on the first booking.
    pub fn get_or_create_venue(&self, id: Ulid) -> SharedVenueState {
        self.venues
            .entry(id)
            .or_insert_with(|| Arc::new(RwLock::new(VenueState::new(id))))
            .value()
            .clone()
    }

    pub fn venue_states(&self) -> Vec<SharedVenueState> {
        self.venues.iter().map(|e| e.value().clone()).collect()
    }

    // ── Reservation index ────────────────────────────────────

    pub fn venue_for_reservation(&self, id: &Ulid) -> Option<Ulid> {
        self.reservation_to_venue.get(id).map(|e| *e.value())
    }

    pub fn user_reservations(&self, user_id: &Ulid) -> Vec<(Ulid, Ulid)> {
        let Some(ids) = self.by_user.get(user_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.venue_for_reservation(id).map(|vid| (*id, vid)))
            .collect()
    }

    // ── Event application ────────────────────────────────────

    /// Apply an event to a venue state. The caller holds its lock.
    pub fn apply_event(&self, vs: &mut VenueState, event: &Event) {
        match event {
            Event::BookingCreated { reservation } => {
                let (id, venue_id, user_id) =
                    (reservation.id, reservation.venue_id, reservation.user_id);
                if vs.insert_reservation(reservation.clone()).is_none() {
                    self.reservation_to_venue.insert(id, venue_id);
                    self.by_user.entry(user_id).or_default().push(id);
                }
            }
            Event::BookingConfirmed { id, at, .. } => {
                vs.set_status(*id, BookingStatus::Confirmed, *at);
            }
            Event::BookingCancelled { id, at, .. } => {
                vs.set_status(*id, BookingStatus::Cancelled, *at);
            }
            Event::BookingExpired { id, at, .. } => {
                vs.set_status(*id, BookingStatus::Expired, *at);
            }
            Event::BookingCompleted { id, at, .. } => {
                vs.set_status(*id, BookingStatus::Completed, *at);
            }
        }
    }
}
