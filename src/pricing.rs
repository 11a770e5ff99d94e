use rust_decimal::{Decimal, RoundingStrategy};

use crate::engine::EngineError;
use crate::limits::MIN_BOOKING_SECS;
use crate::model::Span;

const SECS_PER_HOUR: i64 = 3600;

/// Booking length in hours as an exact rational (e.g. 1.5 for 90 minutes).
pub fn duration_hours(span: &Span) -> Decimal {
    Decimal::from(span.duration().num_seconds()) / Decimal::from(SECS_PER_HOUR)
}

/// Price a booking: `price_per_hour * hours`, rounded half-up to cents.
///
/// Multiplies before dividing so that thirds of an hour don't lose precision.
pub fn quote(price_per_hour: Decimal, span: &Span) -> Result<Decimal, EngineError> {
    let secs = span.duration().num_seconds();
    if secs < MIN_BOOKING_SECS {
        return Err(EngineError::InvalidRange("booking shorter than one minute"));
    }
    let raw = price_per_hour
        .checked_mul(Decimal::from(secs))
        .ok_or(EngineError::LimitExceeded("price overflow"))?
        / Decimal::from(SECS_PER_HOUR);
    Ok(raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}
