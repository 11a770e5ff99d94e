use std::collections::HashMap;

use chrono::{NaiveDate, TimeDelta};

use crate::limits::{AVAILABILITY_DAYS, GREEN_MAX_BOOKINGS, YELLOW_MAX_BOOKINGS};
use crate::model::*;
use crate::venue::OperatingHours;

// ── Availability projection ───────────────────────────────────────

/// Classify a day by how many active bookings start on it.
pub fn day_level(booking_count: u32) -> AvailabilityLevel {
    if booking_count <= GREEN_MAX_BOOKINGS {
        AvailabilityLevel::Green
    } else if booking_count <= YELLOW_MAX_BOOKINGS {
        AvailabilityLevel::Yellow
    } else {
        AvailabilityLevel::Red
    }
}

/// One entry per day for the `AVAILABILITY_DAYS` days after `today`,
/// earliest first.
///
/// A booking counts toward the day its `start_time` falls on, even if it runs
/// past midnight. `available_slots` is whole operating hours minus bookings,
/// floored at zero, regardless of each booking's length.
pub fn weekly_days(
    vs: &VenueState,
    hours: &OperatingHours,
    today: NaiveDate,
) -> Vec<DayAvailability> {
    let first = today + TimeDelta::days(1);
    let last = first + TimeDelta::days(AVAILABILITY_DAYS);

    let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
    for r in vs.active_reservations() {
        let day = r.start_time.date();
        if day >= first && day < last {
            *counts.entry(day).or_default() += 1;
        }
    }

    let total_slots = hours.whole_hours();
    (0..AVAILABILITY_DAYS)
        .map(|offset| {
            let date = first + TimeDelta::days(offset);
            let booking_count = counts.get(&date).copied().unwrap_or(0);
            DayAvailability {
                date,
                weekday: date.format("%A").to_string(),
                status: day_level(booking_count),
                booking_count,
                available_slots: total_slots.saturating_sub(booking_count),
            }
        })
        .collect()
}

/// Consecutive one-hour slots from opening until the last slot that ends at
/// or before closing. A slot is RED if any active reservation overlaps it.
pub fn hourly_slots(vs: &VenueState, hours: &OperatingHours, date: NaiveDate) -> Vec<HourlySlot> {
    let close = date.and_time(hours.closing());
    let mut start = date.and_time(hours.opening());
    let mut slots = Vec::new();

    loop {
        let Some(end) = start.checked_add_signed(TimeDelta::hours(1)) else {
            break;
        };
        if end > close {
            break;
        }
        let busy = vs.overlapping(&Span::new(start, end)).next().is_some();
        slots.push(HourlySlot {
            hour: start.time(),
            status: if busy { SlotStatus::Red } else { SlotStatus::Green },
            is_available: !busy,
        });
        start = end;
    }

    slots
}
