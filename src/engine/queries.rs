use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::availability::{hourly_slots, weekly_days};
use super::conflict::{find_conflict, now};
use super::{Engine, EngineError, SharedVenueState};

impl Engine {
    /// Venue state for reads; a venue without bookings gets a fresh empty
    /// state that is not stored.
    fn venue_or_empty(&self, venue_id: Ulid) -> SharedVenueState {
        self.store
            .get_venue(&venue_id)
            .unwrap_or_else(|| Arc::new(RwLock::new(VenueState::new(venue_id))))
    }

    /// Would `[start, end)` collide with an active reservation on the venue?
    pub async fn conflicts(
        &self,
        venue_id: Ulid,
        start: Ts,
        end: Ts,
        exclude: Option<Ulid>,
    ) -> Result<bool, EngineError> {
        if end <= start {
            return Err(EngineError::InvalidRange("end must be after start"));
        }
        let Some(vs) = self.store.get_venue(&venue_id) else {
            return Ok(false);
        };
        let guard = vs.read().await;
        Ok(find_conflict(&guard, &Span::new(start, end), exclude).is_some())
    }

    pub async fn get_booking(&self, id: Ulid, actor: Actor) -> Result<Reservation, EngineError> {
        let venue_id = self
            .store
            .venue_for_reservation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let vs = self
            .store
            .get_venue(&venue_id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = vs.read().await;
        let visible = guard
            .reservations
            .get(&id)
            .filter(|r| actor.can_act_for(r.user_id))
            .cloned();
        visible.ok_or(EngineError::NotFound(id))
    }

    /// A user's reservations, newest first.
    pub async fn list_user_bookings(&self, user_id: Ulid, page: Page) -> Vec<Reservation> {
        let mut found = Vec::new();
        for (id, venue_id) in self.store.user_reservations(&user_id) {
            if let Some(vs) = self.store.get_venue(&venue_id) {
                let guard = vs.read().await;
                if let Some(r) = guard.reservations.get(&id) {
                    found.push(r.clone());
                }
            }
        }
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found.into_iter().skip(page.skip).take(page.take()).collect()
    }

    /// A venue's reservations, latest start first. The caller has already
    /// checked that the requester may see them.
    pub async fn list_venue_bookings(&self, venue_id: Ulid, page: Page) -> Vec<Reservation> {
        let Some(vs) = self.store.get_venue(&venue_id) else {
            return Vec::new();
        };
        let guard = vs.read().await;
        let mut found: Vec<Reservation> = guard.reservations.values().cloned().collect();
        drop(guard);
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        found.into_iter().skip(page.skip).take(page.take()).collect()
    }

    /// Like `list_venue_bookings`, but only for the venue owner or an admin.
    pub async fn list_venue_bookings_as(
        &self,
        venue_id: Ulid,
        actor: Actor,
        page: Page,
    ) -> Result<Vec<Reservation>, EngineError> {
        let venue = self.directory.get_venue(venue_id).await?;
        if !actor.can_act_for(venue.owner_id) {
            return Err(EngineError::Unauthorized(venue_id));
        }
        Ok(self.list_venue_bookings(venue_id, page).await)
    }

    pub async fn weekly_availability(&self, venue_id: Ulid) -> Result<WeeklyAvailability, EngineError> {
        self.weekly_availability_from(venue_id, now().date()).await
    }

    /// Weekly view for the seven days after `today`.
    pub async fn weekly_availability_from(
        &self,
        venue_id: Ulid,
        today: NaiveDate,
    ) -> Result<WeeklyAvailability, EngineError> {
        let venue = self.directory.get_venue(venue_id).await?;
        let vs = self.venue_or_empty(venue_id);
        let days = weekly_days(&*vs.read().await, &venue.hours, today);
        Ok(WeeklyAvailability {
            venue_id,
            venue_name: venue.name,
            days,
        })
    }

    pub async fn hourly_availability(
        &self,
        venue_id: Ulid,
        date: NaiveDate,
    ) -> Result<HourlyAvailability, EngineError> {
        self.hourly_availability_on(venue_id, date, now().date()).await
    }

    /// Hourly view of `date`; dates before `today` are rejected.
    pub async fn hourly_availability_on(
        &self,
        venue_id: Ulid,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<HourlyAvailability, EngineError> {
        if date < today {
            return Err(EngineError::InvalidRequest("date is in the past"));
        }
        let venue = self.directory.get_venue(venue_id).await?;
        let vs = self.venue_or_empty(venue_id);
        let slots = hourly_slots(&*vs.read().await, &venue.hours, date);
        let total_slots = slots.len() as u32;
        let available_slots = slots.iter().filter(|s| s.is_available).count() as u32;
        Ok(HourlyAvailability {
            venue_id,
            venue_name: venue.name,
            date,
            slots,
            total_slots,
            available_slots,
        })
    }
}
