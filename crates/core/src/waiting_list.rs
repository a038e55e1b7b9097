//! The combined waiting list shown to staff.
//!
//! Concatenates three sub-queues in fixed precedence, each sorted by its own
//! key:
//!
//! | Segment        | Sort key (ascending)  |
//! |----------------|-----------------------|
//! | READY          | `updated_at`          |
//! | IN_PREPARATION | `estimated_ready_at`  |
//! | RECEIVED       | `position`            |
//!
//! Items closest to hand-off come first. This is deliberately not a single
//! global sort.

use crate::error::CoreError;
use crate::preparation::Preparation;
use crate::status::PreparationStatus;
use crate::store::{PreparationStore, QueueOrder};

/// Segments of the waiting list, in display order.
pub const SEGMENTS: [(PreparationStatus, QueueOrder); 3] = [
    (PreparationStatus::Ready, QueueOrder::UpdatedAt),
    (PreparationStatus::InPreparation, QueueOrder::EstimatedReadyAt),
    (PreparationStatus::Received, QueueOrder::Position),
];

/// Build the waiting list from the store's per-status listings.
pub async fn waiting_list(store: &dyn PreparationStore) -> Result<Vec<Preparation>, CoreError> {
    let mut list = Vec::new();
    for (status, order) in SEGMENTS {
        list.extend(store.list_by_status(status, order).await?);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::memory::InMemoryPreparationStore;
    use crate::preparation::UpsertPreparation;

    async fn put(store: &InMemoryPreparationStore, input: UpsertPreparation) {
        store.upsert(&input).await.unwrap();
    }

    fn in_preparation(id: &str, eta_minutes: i64) -> UpsertPreparation {
        UpsertPreparation {
            id: id.to_string(),
            position: None,
            preparation_duration: 5,
            estimated_ready_at: Some(Utc::now() + Duration::minutes(eta_minutes)),
            status: PreparationStatus::InPreparation,
        }
    }

    fn with_status(mut input: UpsertPreparation, status: PreparationStatus) -> UpsertPreparation {
        input.status = status;
        input
    }

    #[tokio::test]
    async fn segments_follow_fixed_precedence() {
        let store = InMemoryPreparationStore::new();
        put(&store, UpsertPreparation::received("r2", 5, 2)).await;
        put(&store, UpsertPreparation::received("r1", 5, 1)).await;
        put(&store, in_preparation("p-late", 30)).await;
        put(&store, in_preparation("p-soon", 3)).await;
        // Updated first but sorts last by id, so only updated_at puts it ahead.
        put(&store, with_status(in_preparation("z-ready", 0), PreparationStatus::Ready)).await;
        put(&store, with_status(in_preparation("a-ready", 0), PreparationStatus::Ready)).await;
        put(&store, with_status(in_preparation("done", 0), PreparationStatus::Completed)).await;

        let ids: Vec<_> = waiting_list(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(
            ids,
            vec!["z-ready", "a-ready", "p-soon", "p-late", "r1", "r2"]
        );
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let store = InMemoryPreparationStore::new();
        for (id, position) in [("a", 1), ("b", 2), ("c", 3)] {
            put(&store, UpsertPreparation::received(id, 5, position)).await;
        }
        put(&store, in_preparation("x", 10)).await;
        put(&store, in_preparation("y", 10)).await;

        let first = waiting_list(&store).await.unwrap();
        let second = waiting_list(&store).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_list() {
        let store = InMemoryPreparationStore::new();
        assert!(waiting_list(&store).await.unwrap().is_empty());
    }
}
