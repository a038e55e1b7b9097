//! In-process adapters for the store and lookup ports.
//!
//! [`InMemoryPreparationStore`] keeps every row behind one
//! `tokio::sync::RwLock`, so each store operation (including the bulk
//! decrement) is applied under a single lock acquisition and is never
//! observed half-done. Queue units stage their writes on a private copy and
//! hold a store-wide mutex until they commit or drop. Clones of the store
//! share both. [`FixedOrderInfoProvider`] answers lookups from a fixed table.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::CoreError;
use crate::order_info::{OrderInfo, OrderInfoProvider};
use crate::preparation::{Preparation, UpsertPreparation};
use crate::status::PreparationStatus;
use crate::store::{PreparationStore, QueueOrder, QueueUpdate};
use crate::types::{Position, Timestamp};

// ---------------------------------------------------------------------------
// InMemoryPreparationStore
// ---------------------------------------------------------------------------

#[derive(Default, Clone)]
struct Rows {
    by_id: HashMap<String, Preparation>,
    last_stamp: Option<Timestamp>,
}

impl Rows {
    /// Strictly increasing "now", so `updated_at` ordering is total.
    fn stamp(&mut self) -> Timestamp {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn received(&self) -> impl Iterator<Item = &Preparation> {
        self.by_id
            .values()
            .filter(|p| p.status == PreparationStatus::Received)
    }

    fn upsert(&mut self, input: &UpsertPreparation) -> Result<Preparation, CoreError> {
        if input.position.is_some() != (input.status == PreparationStatus::Received) {
            return Err(CoreError::Persistence(format!(
                "preparation {} has status {} but position {:?}",
                input.id, input.status, input.position
            )));
        }

        if let Some(position) = input.position {
            let taken = self
                .received()
                .any(|p| p.id != input.id && p.position == Some(position));
            if taken {
                return Err(CoreError::PositionConflict(position));
            }
        }

        let now = self.stamp();
        let created_at = self
            .by_id
            .get(&input.id)
            .map_or(now, |existing| existing.created_at);

        let row = Preparation {
            id: input.id.clone(),
            position: input.position,
            preparation_duration: input.preparation_duration,
            estimated_ready_at: input.estimated_ready_at,
            status: input.status,
            created_at,
            updated_at: now,
        };
        self.by_id.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    fn max_received_position(&self) -> Position {
        self.received().filter_map(|p| p.position).max().unwrap_or(0)
    }

    fn min_position_received(&self) -> Result<Preparation, CoreError> {
        self.received()
            .min_by(|a, b| (a.position, &a.id).cmp(&(b.position, &b.id)))
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "Preparation",
                id: "<received queue head>".to_string(),
            })
    }

    /// Returns the ids of the rows that moved.
    fn decrement_received_positions_above(&mut self, position: Position) -> Vec<String> {
        let now = self.stamp();
        let mut moved = Vec::new();
        for p in self.by_id.values_mut() {
            if p.status != PreparationStatus::Received {
                continue;
            }
            if let Some(current) = p.position.filter(|current| *current > position) {
                p.position = Some(current - 1);
                p.updated_at = now;
                moved.push(p.id.clone());
            }
        }
        moved
    }
}

/// A [`PreparationStore`] backed by a `HashMap`.
#[derive(Default, Clone)]
pub struct InMemoryPreparationStore {
    rows: Arc<RwLock<Rows>>,
    queue_lock: Arc<Mutex<()>>,
}

impl InMemoryPreparationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored preparations, in any status.
    pub async fn len(&self) -> usize {
        self.rows.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PreparationStore for InMemoryPreparationStore {
    async fn upsert(&self, input: &UpsertPreparation) -> Result<Preparation, CoreError> {
        self.rows.write().await.upsert(input)
    }

    async fn find_by_id(&self, id: &str) -> Result<Preparation, CoreError> {
        self.rows
            .read()
            .await
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::preparation_not_found(id))
    }

    async fn exists_by_id(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.rows.read().await.by_id.contains_key(id))
    }

    async fn max_received_position(&self) -> Result<Position, CoreError> {
        Ok(self.rows.read().await.max_received_position())
    }

    async fn min_position_received(&self) -> Result<Preparation, CoreError> {
        self.rows.read().await.min_position_received()
    }

    async fn decrement_received_positions_above(&self, position: Position) -> Result<(), CoreError> {
        self.rows
            .write()
            .await
            .decrement_received_positions_above(position);
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: PreparationStatus,
        order: QueueOrder,
    ) -> Result<Vec<Preparation>, CoreError> {
        let rows = self.rows.read().await;
        let mut list: Vec<Preparation> = rows
            .by_id
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();

        // NULL keys sort last, matching the PostgreSQL default for ASC.
        match order {
            QueueOrder::UpdatedAt => list.sort_by(|a, b| (a.updated_at, &a.id).cmp(&(b.updated_at, &b.id))),
            QueueOrder::EstimatedReadyAt => list.sort_by(|a, b| {
                (a.estimated_ready_at.is_none(), a.estimated_ready_at, &a.id).cmp(&(
                    b.estimated_ready_at.is_none(),
                    b.estimated_ready_at,
                    &b.id,
                ))
            }),
            QueueOrder::Position => list.sort_by(|a, b| {
                (a.position.is_none(), a.position, &a.id).cmp(&(b.position.is_none(), b.position, &b.id))
            }),
        }
        Ok(list)
    }

    async fn update_if_status(
        &self,
        change: &UpsertPreparation,
        expected: PreparationStatus,
    ) -> Result<Option<Preparation>, CoreError> {
        let mut rows = self.rows.write().await;
        match rows.by_id.get(&change.id) {
            Some(current) if current.status == expected => rows.upsert(change).map(Some),
            _ => Ok(None),
        }
    }

    async fn begin_queue_update(&self) -> Result<Box<dyn QueueUpdate>, CoreError> {
        let lease = Arc::clone(&self.queue_lock).lock_owned().await;
        let staged = self.rows.read().await.clone();
        Ok(Box::new(MemoryQueueUpdate {
            live: Arc::clone(&self.rows),
            staged,
            touched: HashSet::new(),
            lease,
        }))
    }
}

/// Queue unit for [`InMemoryPreparationStore`].
///
/// Reads and writes go to `staged`, a copy taken after the lease was
/// granted. Only the rows in `touched` are copied back on commit.
struct MemoryQueueUpdate {
    live: Arc<RwLock<Rows>>,
    staged: Rows,
    touched: HashSet<String>,
    lease: OwnedMutexGuard<()>,
}

#[async_trait]
impl QueueUpdate for MemoryQueueUpdate {
    async fn exists_by_id(&mut self, id: &str) -> Result<bool, CoreError> {
        Ok(self.staged.by_id.contains_key(id))
    }

    async fn max_received_position(&mut self) -> Result<Position, CoreError> {
        Ok(self.staged.max_received_position())
    }

    async fn min_position_received(&mut self) -> Result<Preparation, CoreError> {
        self.staged.min_position_received()
    }

    async fn upsert(&mut self, input: &UpsertPreparation) -> Result<Preparation, CoreError> {
        let row = self.staged.upsert(input)?;
        self.touched.insert(row.id.clone());
        Ok(row)
    }

    async fn decrement_received_positions_above(&mut self, position: Position) -> Result<(), CoreError> {
        let moved = self.staged.decrement_received_positions_above(position);
        self.touched.extend(moved);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let MemoryQueueUpdate {
            live,
            staged,
            touched,
            lease,
        } = *self;

        {
            let mut rows = live.write().await;
            for id in touched {
                if let Some(row) = staged.by_id.get(&id) {
                    rows.by_id.insert(id, row.clone());
                }
            }
            rows.last_stamp = rows.last_stamp.max(staged.last_stamp);
        }

        drop(lease);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FixedOrderInfoProvider
// ---------------------------------------------------------------------------

/// An [`OrderInfoProvider`] answering from a fixed id -> minutes table.
///
/// Unknown ids fail with [`CoreError::Lookup`].
#[derive(Default)]
pub struct FixedOrderInfoProvider {
    durations: HashMap<String, i32>,
    calls: AtomicUsize,
}

impl FixedOrderInfoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order_id: impl Into<String>, preparation_duration: i32) -> Self {
        self.durations.insert(order_id.into(), preparation_duration);
        self
    }

    /// How many times [`resolve`](OrderInfoProvider::resolve) has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderInfoProvider for FixedOrderInfoProvider {
    async fn resolve(&self, order_id: &str) -> Result<OrderInfo, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let preparation_duration = self
            .durations
            .get(order_id)
            .copied()
            .ok_or_else(|| CoreError::Lookup(format!("order {order_id} is unknown")))?;
        Ok(OrderInfo {
            order_id: order_id.to_string(),
            preparation_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    async fn seed(store: &InMemoryPreparationStore, id: &str, position: Position) -> Preparation {
        store
            .upsert(&UpsertPreparation::received(id, 5, position))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let store = InMemoryPreparationStore::new();
        let saved = seed(&store, "a", 1).await;

        let found = store.find_by_id("a").await.unwrap();

        assert_eq!(found, saved);
        assert_eq!(found.created_at, found.updated_at);
    }

    #[tokio::test]
    async fn update_keeps_created_at_and_refreshes_updated_at() {
        let store = InMemoryPreparationStore::new();
        let first = seed(&store, "a", 1).await;

        let mut change = UpsertPreparation::from(first.clone());
        change.start(Utc::now()).unwrap();
        let second = store.upsert(&change).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_received_position_is_a_conflict() {
        let store = InMemoryPreparationStore::new();
        seed(&store, "a", 1).await;

        let result = store.upsert(&UpsertPreparation::received("b", 5, 1)).await;

        assert_matches!(result, Err(CoreError::PositionConflict(1)));
        assert!(!store.exists_by_id("b").await.unwrap());
    }

    #[tokio::test]
    async fn position_without_received_status_is_rejected() {
        let store = InMemoryPreparationStore::new();
        let mut input = UpsertPreparation::received("a", 5, 1);
        input.status = PreparationStatus::Ready;

        assert_matches!(store.upsert(&input).await, Err(CoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = InMemoryPreparationStore::new();

        assert_matches!(store.find_by_id("nope").await, Err(CoreError::NotFound { .. }));
        assert_matches!(store.min_position_received().await, Err(CoreError::NotFound { .. }));
        assert_eq!(store.max_received_position().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn decrement_only_touches_received_rows_above_threshold() {
        let store = InMemoryPreparationStore::new();
        for (id, position) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            seed(&store, id, position).await;
        }
        let mut started = UpsertPreparation::from(store.find_by_id("b").await.unwrap());
        started.start(Utc::now()).unwrap();
        store.upsert(&started).await.unwrap();

        store.decrement_received_positions_above(2).await.unwrap();

        let positions: Vec<_> = store
            .list_by_status(PreparationStatus::Received, QueueOrder::Position)
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, p.position))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("a".to_string(), Some(1)),
                ("c".to_string(), Some(2)),
                ("d".to_string(), Some(3)),
            ]
        );
        assert_eq!(store.find_by_id("b").await.unwrap().position, None);
    }

    #[tokio::test]
    async fn queue_unit_writes_stay_private_until_commit() {
        let store = InMemoryPreparationStore::new();
        seed(&store, "a", 1).await;

        let mut unit = store.begin_queue_update().await.unwrap();
        unit.upsert(&UpsertPreparation::received("b", 5, 2)).await.unwrap();
        assert!(unit.exists_by_id("b").await.unwrap());
        assert!(!store.exists_by_id("b").await.unwrap());

        unit.commit().await.unwrap();

        assert_eq!(store.find_by_id("b").await.unwrap().position, Some(2));
        assert_eq!(store.max_received_position().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn dropped_queue_unit_rolls_back() {
        let store = InMemoryPreparationStore::new();
        for (id, position) in [("a", 1), ("b", 2)] {
            seed(&store, id, position).await;
        }

        {
            let mut unit = store.begin_queue_update().await.unwrap();
            let mut head = UpsertPreparation::from(unit.min_position_received().await.unwrap());
            head.start(Utc::now()).unwrap();
            unit.upsert(&head).await.unwrap();
            unit.decrement_received_positions_above(1).await.unwrap();
        }

        assert_eq!(store.find_by_id("a").await.unwrap().status, PreparationStatus::Received);
        assert_eq!(store.find_by_id("b").await.unwrap().position, Some(2));
    }

    #[tokio::test]
    async fn queue_units_are_exclusive_across_clones() {
        let store = InMemoryPreparationStore::new();
        let other = store.clone();

        let unit = store.begin_queue_update().await.unwrap();
        let waiting = tokio::spawn(async move { other.begin_queue_update().await.map(|_| ()) });

        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        drop(unit);
        waiting.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn update_if_status_skips_rows_that_moved_on() {
        let store = InMemoryPreparationStore::new();
        let row = seed(&store, "a", 1).await;
        let mut started = UpsertPreparation::from(row);
        started.start(Utc::now()).unwrap();

        let applied = store
            .update_if_status(&started, PreparationStatus::InPreparation)
            .await
            .unwrap();
        assert_eq!(applied, None);
        assert_eq!(store.find_by_id("a").await.unwrap().status, PreparationStatus::Received);

        let applied = store
            .update_if_status(&started, PreparationStatus::Received)
            .await
            .unwrap();
        assert_eq!(applied.map(|p| p.status), Some(PreparationStatus::InPreparation));

        let missing = UpsertPreparation::received("nope", 5, 9);
        let applied = store
            .update_if_status(&missing, PreparationStatus::Received)
            .await
            .unwrap();
        assert_eq!(applied, None);
    }

    #[tokio::test]
    async fn fixed_provider_counts_calls_and_rejects_unknown_orders() {
        let provider = FixedOrderInfoProvider::new().with_order("a", 12);

        let info = provider.resolve("a").await.unwrap();
        assert_eq!(info.preparation_duration, 12);
        assert_matches!(provider.resolve("b").await, Err(CoreError::Lookup(_)));
        assert_eq!(provider.calls(), 2);
    }
}
