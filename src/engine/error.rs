use ulid::Ulid;

use crate::model::BookingStatus;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    VenueNotFound(Ulid),
    InvalidRange(&'static str),
    InvalidRequest(&'static str),
    /// Carries the id of the reservation that holds the slot.
    SlotUnavailable(Ulid),
    InvalidState {
        id: Ulid,
        status: BookingStatus,
    },
    Unauthorized(Ulid),
    LimitExceeded(&'static str),
    WalError(String),
}

/// Coarse category for callers that map errors onto their own protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Forbidden,
    Internal,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) | EngineError::VenueNotFound(_) => ErrorKind::NotFound,
            EngineError::InvalidRange(_)
            | EngineError::InvalidRequest(_)
            | EngineError::LimitExceeded(_) => ErrorKind::Validation,
            EngineError::SlotUnavailable(_) | EngineError::InvalidState { .. } => {
                ErrorKind::Conflict
            }
            EngineError::Unauthorized(_) => ErrorKind::Forbidden,
            EngineError::WalError(_) => ErrorKind::Internal,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::VenueNotFound(id) => write!(f, "venue not found: {id}"),
            EngineError::InvalidRange(msg) => write!(f, "invalid range: {msg}"),
            EngineError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            EngineError::SlotUnavailable(id) => {
                write!(f, "slot unavailable: conflicts with reservation {id}")
            }
            EngineError::InvalidState { id, status } => {
                write!(f, "reservation {id} is {status}; transition not allowed")
            }
            EngineError::Unauthorized(id) => write!(f, "not allowed to access {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
