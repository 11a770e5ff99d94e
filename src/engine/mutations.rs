use chrono::TimeDelta;
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::HOLD_WINDOW_SECS;
use crate::model::*;
use crate::observability::{
    BOOKINGS_CREATED_TOTAL, BOOKING_CONFLICTS_TOTAL, BOOKING_TRANSITIONS_TOTAL,
    HOLDS_EXPIRED_TOTAL, WAL_COMPACTIONS_TOTAL,
};
use crate::pricing;

use super::conflict::{check_no_conflict, now, validate_request};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Create a PENDING reservation holding its slot for the hold window.
    pub async fn create_booking(&self, req: NewBooking) -> Result<Reservation, EngineError> {
        let venue = self.directory.get_venue(req.venue_id).await?;
        if !venue.is_active {
            return Err(EngineError::VenueNotFound(req.venue_id));
        }
        let span = validate_request(&req)?;
        let total_price = pricing::quote(venue.price_per_hour, &span)?;

        let _gate = self.commit_gate.read().await;
        let vs = self.store.get_or_create_venue(venue.id);
        let mut guard = vs.write().await;

        if let Err(e) = check_no_conflict(&guard, &span) {
            metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
            debug!("booking on venue {} rejected: {e}", venue.id);
            return Err(e);
        }

        let created_at = now();
        let reservation = Reservation {
            id: Ulid::new(),
            venue_id: venue.id,
            user_id: req.user_id,
            start_time: span.start,
            end_time: span.end,
            total_price,
            status: BookingStatus::Pending,
            notes: req.notes,
            created_at,
            updated_at: created_at,
            hold_expires_at: Some(created_at + TimeDelta::seconds(HOLD_WINDOW_SECS)),
        };
        let event = Event::BookingCreated {
            reservation: reservation.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;

        metrics::counter!(BOOKINGS_CREATED_TOTAL).increment(1);
        info!(
            "booking {} created on venue {} [{}, {}) price {}",
            reservation.id, venue.id, span.start, span.end, total_price
        );
        Ok(reservation)
    }

    pub async fn confirm_booking(&self, id: Ulid, actor: Actor) -> Result<Reservation, EngineError> {
        self.user_transition(id, actor, BookingStatus::Confirmed).await
    }

    pub async fn cancel_booking(&self, id: Ulid, actor: Actor) -> Result<Reservation, EngineError> {
        self.user_transition(id, actor, BookingStatus::Cancelled).await
    }

    /// Expire a reservation whose hold ran out. System use only.
    ///
    /// Re-reads the status under the venue lock: if a confirm or cancel got
    /// there first, this is a no-op returning `Ok(None)`.
    pub async fn expire_booking(&self, id: Ulid) -> Result<Option<Reservation>, EngineError> {
        let expired = self
            .system_transition(id, BookingStatus::Pending, BookingStatus::Expired)
            .await?;
        if expired.is_some() {
            metrics::counter!(HOLDS_EXPIRED_TOTAL).increment(1);
            info!("booking {id} expired: not confirmed within hold window");
        }
        Ok(expired)
    }

    /// Mark a confirmed reservation whose time has passed as completed.
    pub async fn complete_booking(&self, id: Ulid) -> Result<Option<Reservation>, EngineError> {
        self.system_transition(id, BookingStatus::Confirmed, BookingStatus::Completed)
            .await
    }

    async fn user_transition(
        &self,
        id: Ulid,
        actor: Actor,
        to: BookingStatus,
    ) -> Result<Reservation, EngineError> {
        let _gate = self.commit_gate.read().await;
        let (venue_id, mut guard) = self.resolve_reservation_write(&id).await?;

        let (owner, status) = guard
            .reservations
            .get(&id)
            .map(|r| (r.user_id, r.status))
            .ok_or(EngineError::NotFound(id))?;
        // Someone else's booking looks the same as a missing one.
        if !actor.can_act_for(owner) {
            return Err(EngineError::NotFound(id));
        }
        if !status.can_transition_to(to) {
            return Err(EngineError::InvalidState { id, status });
        }

        self.apply_transition(venue_id, &mut guard, id, to).await
    }

    async fn system_transition(
        &self,
        id: Ulid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Reservation>, EngineError> {
        let _gate = self.commit_gate.read().await;
        let (venue_id, mut guard) = self.resolve_reservation_write(&id).await?;

        let status = guard
            .reservations
            .get(&id)
            .map(|r| r.status)
            .ok_or(EngineError::NotFound(id))?;
        if status != from {
            debug!("booking {id} is {status}, skipping {to}");
            return Ok(None);
        }

        self.apply_transition(venue_id, &mut guard, id, to)
            .await
            .map(Some)
    }

    async fn apply_transition(
        &self,
        venue_id: Ulid,
        vs: &mut VenueState,
        id: Ulid,
        to: BookingStatus,
    ) -> Result<Reservation, EngineError> {
        let event = Event::transition(id, venue_id, to, now())
            .ok_or(EngineError::InvalidRequest("cannot move back to pending"))?;
        self.persist_and_apply(vs, &event).await?;
        metrics::counter!(BOOKING_TRANSITIONS_TOTAL, "to" => to.as_str()).increment(1);
        debug!("booking {id} -> {to}");
        vs.reservations
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// PENDING reservations whose hold deadline is at or before `now`,
    /// as `(reservation_id, venue_id)`. Venues locked by a writer are skipped
    /// and picked up on the next sweep.
    pub fn collect_expired_holds(&self, now: Ts) -> Vec<(Ulid, Ulid)> {
        self.collect_where(|r| {
            r.status == BookingStatus::Pending && r.hold_expires_at.is_some_and(|d| d <= now)
        })
    }

    /// CONFIRMED reservations that ended at or before `now`.
    pub fn collect_finished(&self, now: Ts) -> Vec<(Ulid, Ulid)> {
        self.collect_where(|r| r.status == BookingStatus::Confirmed && r.end_time <= now)
    }

    fn collect_where(&self, pred: impl Fn(&Reservation) -> bool) -> Vec<(Ulid, Ulid)> {
        let mut found = Vec::new();
        for vs in self.store.venue_states() {
            if let Ok(guard) = vs.try_read() {
                found.extend(
                    guard
                        .reservations
                        .values()
                        .filter(|r| pred(r))
                        .map(|r| (r.id, guard.venue_id)),
                );
            }
        }
        found
    }

    /// Compact the WAL by rewriting it with one `BookingCreated` per
    /// reservation in its current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _gate = self.commit_gate.write().await;

        let mut reservations = Vec::new();
        for vs in self.store.venue_states() {
            let guard = vs.read().await;
            reservations.extend(guard.reservations.values().cloned());
        }
        reservations.sort_by_key(|r| (r.created_at, r.id));
        let events: Vec<Event> = reservations
            .into_iter()
            .map(|reservation| Event::BookingCreated { reservation })
            .collect();
        let count = events.len();

        self.wal_request(|reply| WalCommand::Compact { events, reply })
            .await?
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        metrics::counter!(WAL_COMPACTIONS_TOTAL).increment(1);
        info!("compacted WAL to {count} reservations");
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        self.wal_request(|reply| WalCommand::AppendsSinceCompact { reply })
            .await
            .unwrap_or(0)
    }
}
