//! Preparation use cases.
//!
//! [`PreparationService`] ties the status machine, position allocator and
//! waiting-list aggregator to the store and order-info ports. Transport
//! adapters (HTTP handlers, queue listeners) call into it and never touch the
//! store directly.
//!
//! Every read-then-write on queue positions runs inside one
//! [`QueueUpdate`](crate::store::QueueUpdate), which the store serializes
//! across all handles on the same storage. Status transitions outside the
//! queue are written only if the row still has the status they were
//! computed from.

use std::sync::Arc;

use chrono::Utc;

use crate::allocator::PositionAllocator;
use crate::error::CoreError;
use crate::order_info::OrderInfoProvider;
use crate::preparation::{Preparation, UpsertPreparation};
use crate::status::PreparationStatus;
use crate::store::PreparationStore;
use crate::waiting_list;

pub struct PreparationService {
    store: Arc<dyn PreparationStore>,
    orders: Arc<dyn OrderInfoProvider>,
}

impl PreparationService {
    pub fn new(store: Arc<dyn PreparationStore>, orders: Arc<dyn OrderInfoProvider>) -> Self {
        Self { store, orders }
    }

    pub fn store(&self) -> &dyn PreparationStore {
        self.store.as_ref()
    }

    /// Queue a new preparation for the order `id` at the tail of the
    /// RECEIVED queue.
    ///
    /// The preparation is stored under the order id the order service
    /// answers with. Redelivered ids fail with [`CoreError::AlreadyExists`]
    /// before the order service is contacted.
    #[tracing::instrument(skip(self), fields(preparation_id = %id))]
    pub async fn intake(&self, id: &str) -> Result<Preparation, CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Preparation id must not be empty".to_string(),
            ));
        }

        if self.store.exists_by_id(id).await? {
            return Err(CoreError::AlreadyExists(id.to_string()));
        }

        let order = self.orders.resolve(id).await?;
        if order.order_id.trim().is_empty() {
            return Err(CoreError::Lookup(format!(
                "order service returned no order id for {id}"
            )));
        }
        if order.preparation_duration <= 0 {
            return Err(CoreError::Lookup(format!(
                "order {} has non-positive preparation time {}",
                order.order_id, order.preparation_duration
            )));
        }

        let mut queue = self.store.begin_queue_update().await?;

        // A concurrent delivery of the same order may have landed while the
        // order was being resolved.
        if queue.exists_by_id(&order.order_id).await? {
            return Err(CoreError::AlreadyExists(order.order_id));
        }

        let position = PositionAllocator::next_position(queue.as_mut()).await?;
        let input = UpsertPreparation::received(
            order.order_id.as_str(),
            order.preparation_duration,
            position,
        );
        let saved = queue.upsert(&input).await?;
        queue.commit().await?;

        tracing::info!(order_id = %saved.id, position, "Preparation received");
        Ok(saved)
    }

    /// Move the head of the RECEIVED queue into preparation and close the
    /// gap it leaves.
    ///
    /// Both writes commit together. If renumbering fails the head stays
    /// RECEIVED at its old position.
    #[tracing::instrument(skip(self))]
    pub async fn start_next(&self) -> Result<Preparation, CoreError> {
        let mut queue = self.store.begin_queue_update().await?;

        let head = match queue.min_position_received().await {
            Ok(head) => head,
            Err(CoreError::NotFound { .. }) => return Err(CoreError::QueueEmpty),
            Err(e) => return Err(e),
        };
        let old_position = head.position;

        let mut change = UpsertPreparation::from(head);
        change.start(Utc::now())?;
        let started = queue.upsert(&change).await?;

        if let Some(old_position) = old_position {
            if let Err(e) = PositionAllocator::vacate(queue.as_mut(), old_position).await {
                tracing::error!(
                    preparation_id = %started.id,
                    old_position,
                    error = %e,
                    "Queue positions could not be renumbered, start rolled back"
                );
                return Err(e);
            }
        }
        queue.commit().await?;

        tracing::info!(
            preparation_id = %started.id,
            estimated_ready_at = ?started.estimated_ready_at,
            "Preparation started"
        );
        Ok(started)
    }

    #[tracing::instrument(skip(self), fields(preparation_id = %id))]
    pub async fn mark_ready(&self, id: &str) -> Result<Preparation, CoreError> {
        let saved = self
            .transition(id, PreparationStatus::Ready, UpsertPreparation::mark_ready)
            .await?;
        tracing::info!("Preparation ready");
        Ok(saved)
    }

    #[tracing::instrument(skip(self), fields(preparation_id = %id))]
    pub async fn mark_completed(&self, id: &str) -> Result<Preparation, CoreError> {
        let saved = self
            .transition(id, PreparationStatus::Completed, UpsertPreparation::mark_completed)
            .await?;
        tracing::info!("Preparation completed");
        Ok(saved)
    }

    pub async fn waiting_list(&self) -> Result<Vec<Preparation>, CoreError> {
        let list = waiting_list::waiting_list(self.store.as_ref()).await?;
        tracing::debug!(count = list.len(), "Waiting list read");
        Ok(list)
    }

    /// Apply `advance` to the current row and write it back only if nobody
    /// changed the row's status in between.
    async fn transition(
        &self,
        id: &str,
        target: PreparationStatus,
        advance: fn(&mut UpsertPreparation) -> Result<(), CoreError>,
    ) -> Result<Preparation, CoreError> {
        let mut change = self.load(id).await?;
        let expected = change.status;
        advance(&mut change)?;

        match self.store.update_if_status(&change, expected).await? {
            Some(saved) => Ok(saved),
            None => {
                let current = self.load(id).await?.status;
                tracing::warn!(%expected, %current, "Preparation changed status concurrently");
                Err(CoreError::InvalidTransition {
                    id: id.to_string(),
                    current,
                    target,
                })
            }
        }
    }

    async fn load(&self, id: &str) -> Result<UpsertPreparation, CoreError> {
        match self.store.find_by_id(id).await {
            Ok(found) => Ok(found.into()),
            Err(CoreError::NotFound { .. }) => Err(CoreError::preparation_not_found(id)),
            Err(e) => Err(e),
        }
    }
}
