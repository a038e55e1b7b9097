use crate::status::PreparationStatus;
use crate::types::Position;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(
        "A preparation with status {current} cannot be moved to {target} (id {id})"
    )]
    InvalidTransition {
        id: String,
        current: PreparationStatus,
        target: PreparationStatus,
    },

    #[error("Preparation for payment id {0} already exists")]
    AlreadyExists(String),

    #[error("No received preparation is waiting to be started")]
    QueueEmpty,

    #[error("Queue position {0} is already held by another received preparation")]
    PositionConflict(Position),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Order info lookup failed: {0}")]
    Lookup(String),
}

impl CoreError {
    /// Shorthand for a missing preparation.
    pub fn preparation_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: "Preparation",
            id: id.into(),
        }
    }
}
