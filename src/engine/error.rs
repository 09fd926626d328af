use serde::Serialize;
use thiserror::Error;
use ulid::Ulid;

use crate::model::{ReservationStatus, RoomSize};

/// Coarse failure classes. Callers branch on these, not on variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientCapacity,
    Conflict,
    Storage,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientCapacity => "insufficient_capacity",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    #[error("hotel with this name already exists: {0}")]
    DuplicateHotel(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("insufficient {size} rooms at hotel {hotel_id}: requested {requested}, available {available}")]
    InsufficientCapacity {
        hotel_id: Ulid,
        size: RoomSize,
        requested: u32,
        available: u32,
    },

    #[error("release of {quantity} {size} rooms at hotel {hotel_id} would exceed total ({available} available of {total})")]
    OverRelease {
        hotel_id: Ulid,
        size: RoomSize,
        quantity: u32,
        available: u32,
        total: u32,
    },

    #[error("reservation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Ulid,
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_)
            | EngineError::LimitExceeded(_)
            | EngineError::DuplicateHotel(_)
            | EngineError::OverRelease { .. }
            | EngineError::InvalidTransition { .. } => ErrorKind::Validation,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Conflicts and storage failures may succeed on a later attempt; nothing else will.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Storage)
    }
}
