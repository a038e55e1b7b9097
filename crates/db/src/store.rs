//! [`PreparationStore`] backed by PostgreSQL.

use async_trait::async_trait;
use preparation_core::error::CoreError;
use preparation_core::preparation::{Preparation, UpsertPreparation};
use preparation_core::status::PreparationStatus;
use preparation_core::store::{PreparationStore, QueueOrder, QueueUpdate};
use preparation_core::types::Position;
use sqlx::{Postgres, Transaction};

use crate::models::preparation::PreparationRow;
use crate::repositories::preparation_repo::RECEIVED_POSITION_CONSTRAINT;
use crate::repositories::PreparationRepo;
use crate::DbPool;

/// PostgreSQL exclusion-constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Store adapter over a shared connection pool.
#[derive(Clone)]
pub struct PgPreparationStore {
    pool: DbPool,
}

impl PgPreparationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Log the full database error and hand back an opaque persistence failure.
fn persistence(operation: &'static str, err: sqlx::Error) -> CoreError {
    tracing::error!(operation, error = %err, "Database error");
    CoreError::Persistence(format!("{operation} failed"))
}

fn is_position_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(EXCLUSION_VIOLATION)
                && db_err.constraint() == Some(RECEIVED_POSITION_CONSTRAINT)
        }
        _ => false,
    }
}

fn upsert_failure(input: &UpsertPreparation, err: sqlx::Error) -> CoreError {
    if is_position_conflict(&err) {
        CoreError::PositionConflict(input.position.unwrap_or_default())
    } else {
        persistence("upsert preparation", err)
    }
}

fn queue_head_missing() -> CoreError {
    CoreError::NotFound {
        entity: "Preparation",
        id: "<received queue head>".to_string(),
    }
}

fn into_domain(rows: Vec<PreparationRow>) -> Result<Vec<Preparation>, CoreError> {
    rows.into_iter().map(Preparation::try_from).collect()
}

#[async_trait]
impl PreparationStore for PgPreparationStore {
    async fn upsert(&self, input: &UpsertPreparation) -> Result<Preparation, CoreError> {
        PreparationRepo::upsert(&self.pool, input)
            .await
            .map_err(|e| upsert_failure(input, e))?
            .try_into()
    }

    async fn find_by_id(&self, id: &str) -> Result<Preparation, CoreError> {
        PreparationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(|e| persistence("find preparation", e))?
            .ok_or_else(|| CoreError::preparation_not_found(id))?
            .try_into()
    }

    async fn exists_by_id(&self, id: &str) -> Result<bool, CoreError> {
        PreparationRepo::exists_by_id(&self.pool, id)
            .await
            .map_err(|e| persistence("check preparation existence", e))
    }

    async fn max_received_position(&self) -> Result<Position, CoreError> {
        PreparationRepo::max_received_position(&self.pool)
            .await
            .map_err(|e| persistence("read max received position", e))
    }

    async fn min_position_received(&self) -> Result<Preparation, CoreError> {
        PreparationRepo::min_position_received(&self.pool)
            .await
            .map_err(|e| persistence("read queue head", e))?
            .ok_or_else(queue_head_missing)?
            .try_into()
    }

    async fn decrement_received_positions_above(&self, position: Position) -> Result<(), CoreError> {
        let shifted = PreparationRepo::decrement_received_positions_above(&self.pool, position)
            .await
            .map_err(|e| persistence("renumber received positions", e))?;
        tracing::debug!(position, shifted, "Received positions renumbered");
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: PreparationStatus,
        order: QueueOrder,
    ) -> Result<Vec<Preparation>, CoreError> {
        let rows = PreparationRepo::list_by_status(&self.pool, status, order)
            .await
            .map_err(|e| persistence("list preparations", e))?;
        into_domain(rows)
    }

    async fn update_if_status(
        &self,
        change: &UpsertPreparation,
        expected: PreparationStatus,
    ) -> Result<Option<Preparation>, CoreError> {
        PreparationRepo::update_if_status(&self.pool, change, expected)
            .await
            .map_err(|e| persistence("update preparation status", e))?
            .map(Preparation::try_from)
            .transpose()
    }

    async fn begin_queue_update(&self) -> Result<Box<dyn QueueUpdate>, CoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persistence("begin queue transaction", e))?;
        PreparationRepo::lock_queue(&mut *tx)
            .await
            .map_err(|e| persistence("acquire queue lock", e))?;
        Ok(Box::new(PgQueueUpdate {
            tx,
            last_position: None,
        }))
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(|e| persistence("health check", e))
    }
}

/// A queue unit: one transaction holding the queue advisory lock.
///
/// Dropping it without [`commit`](QueueUpdate::commit) rolls the transaction
/// back, which also releases the lock.
pub struct PgQueueUpdate {
    tx: Transaction<'static, Postgres>,
    /// Last RECEIVED position written, reported if the deferred exclusion
    /// check fails at commit.
    last_position: Option<Position>,
}

#[async_trait]
impl QueueUpdate for PgQueueUpdate {
    async fn exists_by_id(&mut self, id: &str) -> Result<bool, CoreError> {
        PreparationRepo::exists_by_id(&mut *self.tx, id)
            .await
            .map_err(|e| persistence("check preparation existence", e))
    }

    async fn max_received_position(&mut self) -> Result<Position, CoreError> {
        PreparationRepo::max_received_position(&mut *self.tx)
            .await
            .map_err(|e| persistence("read max received position", e))
    }

    async fn min_position_received(&mut self) -> Result<Preparation, CoreError> {
        PreparationRepo::min_position_received(&mut *self.tx)
            .await
            .map_err(|e| persistence("read queue head", e))?
            .ok_or_else(queue_head_missing)?
            .try_into()
    }

    async fn upsert(&mut self, input: &UpsertPreparation) -> Result<Preparation, CoreError> {
        let row = PreparationRepo::upsert(&mut *self.tx, input)
            .await
            .map_err(|e| upsert_failure(input, e))?;
        if input.position.is_some() {
            self.last_position = input.position;
        }
        row.try_into()
    }

    async fn decrement_received_positions_above(&mut self, position: Position) -> Result<(), CoreError> {
        let shifted = PreparationRepo::decrement_received_positions_above(&mut *self.tx, position)
            .await
            .map_err(|e| persistence("renumber received positions", e))?;
        tracing::debug!(position, shifted, "Received positions renumbered");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let PgQueueUpdate { tx, last_position } = *self;
        match tx.commit().await {
            Ok(()) => Ok(()),
            Err(e) if is_position_conflict(&e) => {
                tracing::warn!(error = %e, "Queue transaction rejected by position constraint");
                Err(CoreError::PositionConflict(last_position.unwrap_or_default()))
            }
            Err(e) => Err(persistence("commit queue transaction", e)),
        }
    }
}
