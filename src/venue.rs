use std::io;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveTime;
use dashmap::DashMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use ulid::Ulid;

use crate::engine::EngineError;

/// Daily opening window. Always `opening < closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    opening: NaiveTime,
    closing: NaiveTime,
}

impl OperatingHours {
    pub fn new(opening: NaiveTime, closing: NaiveTime) -> Option<Self> {
        (opening < closing).then_some(Self { opening, closing })
    }

    /// Parse `HH:MM` strings.
    pub fn parse(opening: &str, closing: &str) -> Option<Self> {
        let opening = NaiveTime::parse_from_str(opening, "%H:%M").ok()?;
        let closing = NaiveTime::parse_from_str(closing, "%H:%M").ok()?;
        Self::new(opening, closing)
    }

    pub fn opening(&self) -> NaiveTime {
        self.opening
    }

    pub fn closing(&self) -> NaiveTime {
        self.closing
    }

    /// Whole one-hour slots between opening and closing.
    pub fn whole_hours(&self) -> u32 {
        let minutes = (self.closing - self.opening).num_minutes();
        (minutes / 60) as u32
    }
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self {
            opening: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            closing: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
        }
    }
}

/// A bookable venue, as supplied by the venue directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venue {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
    pub price_per_hour: Decimal,
    pub hours: OperatingHours,
    pub is_active: bool,
}

/// Read-only source of venues. Venue CRUD lives outside this crate.
#[async_trait]
pub trait VenueDirectory: Send + Sync {
    /// Fails with `VenueNotFound` when the id is unknown.
    async fn get_venue(&self, id: Ulid) -> Result<Venue, EngineError>;
}

/// Venues held in memory, optionally seeded from a JSON file.
#[derive(Default)]
pub struct InMemoryVenueDirectory {
    venues: DashMap<Ulid, Venue>,
}

/// On-disk shape of a venue: hours as `HH:MM`, price as a decimal string.
#[derive(Debug, Deserialize)]
struct VenueRecord {
    id: Ulid,
    owner_id: Ulid,
    name: String,
    price_per_hour: String,
    #[serde(default = "default_opening")]
    opening_hour: String,
    #[serde(default = "default_closing")]
    closing_hour: String,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_opening() -> String {
    "06:00".into()
}

fn default_closing() -> String {
    "23:00".into()
}

fn default_active() -> bool {
    true
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

impl TryFrom<VenueRecord> for Venue {
    type Error = io::Error;

    fn try_from(rec: VenueRecord) -> io::Result<Self> {
        let hours = OperatingHours::parse(&rec.opening_hour, &rec.closing_hour).ok_or_else(|| {
            invalid(format!(
                "venue {}: invalid operating hours {}-{}",
                rec.id, rec.opening_hour, rec.closing_hour
            ))
        })?;
        let price = Decimal::from_str(&rec.price_per_hour)
            .map_err(|e| invalid(format!("venue {}: bad price: {e}", rec.id)))?;
        if price.is_sign_negative() {
            return Err(invalid(format!("venue {}: negative price", rec.id)));
        }
        Ok(Venue {
            id: rec.id,
            owner_id: rec.owner_id,
            name: rec.name,
            price_per_hour: price
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            hours,
            is_active: rec.is_active,
        })
    }
}

impl InMemoryVenueDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of venues.
    pub fn from_json(json: &str) -> io::Result<Self> {
        let records: Vec<VenueRecord> = serde_json::from_str(json)?;
        let dir = Self::new();
        for rec in records {
            dir.insert(Venue::try_from(rec)?);
        }
        Ok(dir)
    }

    pub fn load_file(path: &Path) -> io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn insert(&self, venue: Venue) {
        self.venues.insert(venue.id, venue);
    }

    pub fn remove(&self, id: &Ulid) -> Option<Venue> {
        self.venues.remove(id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}

#[async_trait]
impl VenueDirectory for InMemoryVenueDirectory {
    async fn get_venue(&self, id: Ulid) -> Result<Venue, EngineError> {
        self.venues
            .get(&id)
            .map(|v| v.value().clone())
            .ok_or(EngineError::VenueNotFound(id))
    }
}
