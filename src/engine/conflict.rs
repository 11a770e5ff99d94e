use ulid::Ulid;

use crate::limits::MAX_NOTES_LEN;
use crate::model::*;

use super::EngineError;

/// Current local wall-clock time.
pub(crate) fn now() -> Ts {
    chrono::Local::now().naive_local()
}

pub(crate) fn validate_request(req: &NewBooking) -> Result<Span, EngineError> {
    if req.end <= req.start {
        return Err(EngineError::InvalidRange("end must be after start"));
    }
    if let Some(ref notes) = req.notes
        && notes.len() > MAX_NOTES_LEN
    {
        return Err(EngineError::LimitExceeded("notes too long"));
    }
    Ok(Span::new(req.start, req.end))
}

/// First active reservation overlapping `span`, skipping `exclude`.
pub(crate) fn find_conflict(vs: &VenueState, span: &Span, exclude: Option<Ulid>) -> Option<Ulid> {
    vs.overlapping(span)
        .find(|c| Some(c.id) != exclude && c.span.overlaps(span))
        .map(|c| c.id)
}

pub(crate) fn check_no_conflict(vs: &VenueState, span: &Span) -> Result<(), EngineError> {
    match find_conflict(vs, span, None) {
        Some(id) => Err(EngineError::SlotUnavailable(id)),
        None => Ok(()),
    }
}
