//! The persistence port for preparations.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::preparation::{Preparation, UpsertPreparation};
use crate::status::PreparationStatus;
use crate::types::Position;

/// Sort key for [`PreparationStore::list_by_status`].
///
/// Every key sorts ascending with `id` as the tiebreaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    UpdatedAt,
    EstimatedReadyAt,
    Position,
}

/// Storage contract the use cases depend on.
///
/// Every method either fully succeeds or leaves state unchanged. Storage
/// faults surface as [`CoreError::Persistence`]; lookup misses surface as
/// [`CoreError::NotFound`].
#[async_trait]
pub trait PreparationStore: Send + Sync {
    /// Insert when the id is unknown, otherwise replace the full record.
    ///
    /// Returns the persisted row with store-assigned timestamps. Fails with
    /// [`CoreError::PositionConflict`] when a RECEIVED record would share its
    /// position with another RECEIVED record.
    async fn upsert(&self, preparation: &UpsertPreparation) -> Result<Preparation, CoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Preparation, CoreError>;

    async fn exists_by_id(&self, id: &str) -> Result<bool, CoreError>;

    /// Highest position held by a RECEIVED preparation, or 0 when none.
    async fn max_received_position(&self) -> Result<Position, CoreError>;

    /// The RECEIVED preparation at the head of the queue.
    async fn min_position_received(&self) -> Result<Preparation, CoreError>;

    /// Shift every RECEIVED preparation above `position` down by one, as a
    /// single atomic update.
    async fn decrement_received_positions_above(&self, position: Position) -> Result<(), CoreError>;

    async fn list_by_status(
        &self,
        status: PreparationStatus,
        order: QueueOrder,
    ) -> Result<Vec<Preparation>, CoreError>;

    /// Write `change` only while the stored row still has status
    /// `expected`.
    ///
    /// Returns `None`, leaving the row untouched, when the row is missing or
    /// another writer already moved it on.
    async fn update_if_status(
        &self,
        change: &UpsertPreparation,
        expected: PreparationStatus,
    ) -> Result<Option<Preparation>, CoreError>;

    /// Open a [`QueueUpdate`] holding the queue lock.
    ///
    /// The lock is shared by every handle on the same storage, including
    /// handles in other processes, so position reads and writes made through
    /// one unit are never interleaved with another unit's.
    async fn begin_queue_update(&self) -> Result<Box<dyn QueueUpdate>, CoreError>;

    /// Whether the backing storage is reachable.
    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// A unit of work over RECEIVED positions, serialized against every other
/// unit on the same storage.
///
/// Nothing written through the unit is visible to other readers before
/// [`commit`](QueueUpdate::commit). Dropping the unit without committing
/// discards its writes and releases the lock.
#[async_trait]
pub trait QueueUpdate: Send {
    async fn exists_by_id(&mut self, id: &str) -> Result<bool, CoreError>;

    async fn max_received_position(&mut self) -> Result<Position, CoreError>;

    async fn min_position_received(&mut self) -> Result<Preparation, CoreError>;

    async fn upsert(&mut self, preparation: &UpsertPreparation) -> Result<Preparation, CoreError>;

    async fn decrement_received_positions_above(&mut self, position: Position) -> Result<(), CoreError>;

    /// Publish the unit's writes atomically and release the lock.
    async fn commit(self: Box<Self>) -> Result<(), CoreError>;
}
