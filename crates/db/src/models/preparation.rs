//! Row model for the `preparations` table.

use preparation_core::error::CoreError;
use preparation_core::preparation::Preparation;
use preparation_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `preparations` table.
///
/// `status` is kept as text here and parsed when converting into the domain
/// [`Preparation`].
#[derive(Debug, Clone, FromRow)]
pub struct PreparationRow {
    pub id: String,
    pub position: Option<i32>,
    pub preparation_duration: i32,
    pub estimated_ready_at: Option<Timestamp>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<PreparationRow> for Preparation {
    type Error = CoreError;

    fn try_from(row: PreparationRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            CoreError::Persistence(format!(
                "preparation {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Preparation {
            id: row.id,
            position: row.position,
            preparation_duration: row.preparation_duration,
            estimated_ready_at: row.estimated_ready_at,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
