//! Engine error types

use deskbook_store::StoreError;
use deskbook_util::{ReservationId, ResourceId};
use thiserror::Error;

/// Every failure the engine reports. All of them are recoverable: the
/// operation is aborted and nothing in memory or in the store changed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflicts with reservation {conflicting_id}")]
    Conflict { conflicting_id: ReservationId },

    #[error("Resource not found: {0}")]
    ResourceNotFound(ResourceId),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    #[error("Resource already exists: {0}")]
    DuplicateResource(ResourceId),

    #[error("Reservation already exists: {0}")]
    DuplicateReservation(ReservationId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
