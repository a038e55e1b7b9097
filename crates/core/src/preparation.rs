//! The preparation record and its status machine.
//!
//! [`Preparation`] is what the store returns (including store-assigned
//! timestamps). [`UpsertPreparation`] is the mutable record the status
//! machine operates on and the store persists.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::PreparationStatus;
use crate::types::{Position, PreparationId, Timestamp};

/// A persisted preparation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preparation {
    pub id: PreparationId,
    /// Present only while `status` is RECEIVED.
    pub position: Option<Position>,
    /// Minutes of work, fixed at intake.
    pub preparation_duration: i32,
    /// Stamped when the preparation enters IN_PREPARATION.
    pub estimated_ready_at: Option<Timestamp>,
    pub status: PreparationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Full-record write passed to [`PreparationStore::upsert`](crate::store::PreparationStore::upsert).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertPreparation {
    pub id: PreparationId,
    pub position: Option<Position>,
    pub preparation_duration: i32,
    pub estimated_ready_at: Option<Timestamp>,
    pub status: PreparationStatus,
}

impl UpsertPreparation {
    /// A freshly received preparation queued at `position`.
    pub fn received(id: impl Into<PreparationId>, preparation_duration: i32, position: Position) -> Self {
        Self {
            id: id.into(),
            position: Some(position),
            preparation_duration,
            estimated_ready_at: None,
            status: PreparationStatus::Received,
        }
    }

    /// RECEIVED -> IN_PREPARATION.
    ///
    /// Leaves the queue (position cleared) and stamps the estimate as
    /// `now + preparation_duration` minutes.
    pub fn start(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.advance(PreparationStatus::InPreparation)?;
        self.position = None;
        self.estimated_ready_at =
            Some(now + Duration::minutes(i64::from(self.preparation_duration)));
        Ok(())
    }

    /// IN_PREPARATION -> READY.
    pub fn mark_ready(&mut self) -> Result<(), CoreError> {
        self.advance(PreparationStatus::Ready)
    }

    /// READY -> COMPLETED.
    pub fn mark_completed(&mut self) -> Result<(), CoreError> {
        self.advance(PreparationStatus::Completed)
    }

    fn advance(&mut self, target: PreparationStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(target) {
            return Err(CoreError::InvalidTransition {
                id: self.id.clone(),
                current: self.status,
                target,
            });
        }
        self.status = target;
        Ok(())
    }
}

impl From<Preparation> for UpsertPreparation {
    fn from(p: Preparation) -> Self {
        Self {
            id: p.id,
            position: p.position,
            preparation_duration: p.preparation_duration,
            estimated_ready_at: p.estimated_ready_at,
            status: p.status,
        }
    }
}
