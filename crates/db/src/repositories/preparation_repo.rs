//! Repository for the `preparations` table.

use preparation_core::preparation::UpsertPreparation;
use preparation_core::status::PreparationStatus;
use preparation_core::store::QueueOrder;
use sqlx::PgExecutor;

use crate::models::preparation::PreparationRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, position, preparation_duration, estimated_ready_at, \
    status, created_at, updated_at";

/// Name of the constraint rejecting two RECEIVED rows at one position.
pub const RECEIVED_POSITION_CONSTRAINT: &str = "ex_preparations_received_position";

/// Advisory lock held for the duration of every queue transaction.
pub const QUEUE_LOCK_ID: i64 = 611_402_387;

/// Provides query operations for preparations.
///
/// Every method takes any Postgres executor, so the same query runs on the
/// pool or inside an open transaction (`&mut *tx`).
pub struct PreparationRepo;

impl PreparationRepo {
    /// Block until this transaction holds [`QUEUE_LOCK_ID`].
    ///
    /// Released automatically at commit or rollback.
    pub async fn lock_queue<'e>(executor: impl PgExecutor<'e>) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(QUEUE_LOCK_ID)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Insert a preparation, or overwrite every mutable column of an existing
    /// one. `created_at` is kept; `updated_at` is refreshed.
    pub async fn upsert<'e>(
        executor: impl PgExecutor<'e>,
        input: &UpsertPreparation,
    ) -> Result<PreparationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO preparations \
                (id, position, preparation_duration, estimated_ready_at, status) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
                position = EXCLUDED.position, \
                preparation_duration = EXCLUDED.preparation_duration, \
                estimated_ready_at = EXCLUDED.estimated_ready_at, \
                status = EXCLUDED.status, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreparationRow>(&query)
            .bind(&input.id)
            .bind(input.position)
            .bind(input.preparation_duration)
            .bind(input.estimated_ready_at)
            .bind(input.status.as_str())
            .fetch_one(executor)
            .await
    }

    /// Overwrite the mutable columns of `input.id` only while its status is
    /// still `expected`. `None` when no row matched.
    pub async fn update_if_status<'e>(
        executor: impl PgExecutor<'e>,
        input: &UpsertPreparation,
        expected: PreparationStatus,
    ) -> Result<Option<PreparationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE preparations SET \
                position = $2, \
                preparation_duration = $3, \
                estimated_ready_at = $4, \
                status = $5, \
                updated_at = NOW() \
             WHERE id = $1 AND status = $6 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreparationRow>(&query)
            .bind(&input.id)
            .bind(input.position)
            .bind(input.preparation_duration)
            .bind(input.estimated_ready_at)
            .bind(input.status.as_str())
            .bind(expected.as_str())
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: &str,
    ) -> Result<Option<PreparationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM preparations WHERE id = $1");
        sqlx::query_as::<_, PreparationRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn exists_by_id<'e>(executor: impl PgExecutor<'e>, id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM preparations WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Highest RECEIVED position, or 0 on an empty queue.
    pub async fn max_received_position<'e>(executor: impl PgExecutor<'e>) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(position), 0) FROM preparations WHERE status = $1",
        )
        .bind(PreparationStatus::Received.as_str())
        .fetch_one(executor)
        .await
    }

    /// The RECEIVED row at the head of the queue, if any.
    pub async fn min_position_received<'e>(
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<PreparationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM preparations \
             WHERE status = $1 \
             ORDER BY position ASC, id ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, PreparationRow>(&query)
            .bind(PreparationStatus::Received.as_str())
            .fetch_optional(executor)
            .await
    }

    /// Move every RECEIVED row above `position` one place forward.
    ///
    /// A single statement, so concurrent readers see either none or all of
    /// the renumbering. Returns the number of rows shifted.
    pub async fn decrement_received_positions_above<'e>(
        executor: impl PgExecutor<'e>,
        position: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE preparations \
             SET position = position - 1, updated_at = NOW() \
             WHERE status = $1 AND position > $2",
        )
        .bind(PreparationStatus::Received.as_str())
        .bind(position)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// All rows in `status`, sorted ascending by `order` then `id`.
    pub async fn list_by_status<'e>(
        executor: impl PgExecutor<'e>,
        status: PreparationStatus,
        order: QueueOrder,
    ) -> Result<Vec<PreparationRow>, sqlx::Error> {
        let order_column = match order {
            QueueOrder::UpdatedAt => "updated_at",
            QueueOrder::EstimatedReadyAt => "estimated_ready_at",
            QueueOrder::Position => "position",
        };
        let query = format!(
            "SELECT {COLUMNS} FROM preparations \
             WHERE status = $1 \
             ORDER BY {order_column} ASC NULLS LAST, id ASC"
        );
        sqlx::query_as::<_, PreparationRow>(&query)
            .bind(status.as_str())
            .fetch_all(executor)
            .await
    }
}
