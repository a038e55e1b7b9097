//! Queue position bookkeeping for RECEIVED preparations.
//!
//! Positions are dense and 1-based. Intake appends at `max + 1`; whenever a
//! preparation leaves the RECEIVED pool, everything behind it moves up one
//! place in a single bulk update. Renumbering on every departure keeps the
//! append a plain max read.
//!
//! Both operations run inside a [`QueueUpdate`], so the max read and the
//! write that follows it cannot interleave with another writer's.

use crate::error::CoreError;
use crate::store::QueueUpdate;
use crate::types::Position;

/// Assigns and reclaims queue positions against durable state.
///
/// Holds no state of its own: every answer is read through the open unit at
/// call time.
pub struct PositionAllocator;

impl PositionAllocator {
    /// Position for the next received preparation (1 on an empty queue).
    pub async fn next_position(queue: &mut dyn QueueUpdate) -> Result<Position, CoreError> {
        let max = queue.max_received_position().await?;
        Ok(max + 1)
    }

    /// Close the gap left at `old_position`.
    pub async fn vacate(queue: &mut dyn QueueUpdate, old_position: Position) -> Result<(), CoreError> {
        queue.decrement_received_positions_above(old_position).await
    }
}
