//! Feeds stored events into the order read model.

use std::collections::HashMap;
use std::sync::Arc;

use common::AggregateId;
use domain::{Aggregate, Order};
use event_store::{EventEnvelope, EventStore, EventStoreExt};
use futures_util::StreamExt;

use crate::Result;
use crate::projection::{Projection, fold};
use crate::read_model::{OrderModel, ReadModelStore};
use crate::views::OrderModelProjection;

/// Applies events from an event store to the order read model.
///
/// The processor supports:
/// - Incremental update: folds freshly appended events into the stored model
/// - Catch-up: replays one whole stream from empty and stores the result
/// - Rebuild: replays every event in the store
pub struct ProjectionProcessor<S: EventStore, R: ReadModelStore> {
    store: Arc<S>,
    read_models: Arc<R>,
    projection: OrderModelProjection,
}

impl<S: EventStore, R: ReadModelStore> ProjectionProcessor<S, R> {
    /// Creates a processor over the given stores.
    pub fn new(store: Arc<S>, read_models: Arc<R>) -> Self {
        Self {
            store,
            read_models,
            projection: OrderModelProjection::new(),
        }
    }

    /// Returns the read model store this processor writes to.
    pub fn read_models(&self) -> &R {
        &self.read_models
    }

    /// Folds newly committed events into the stored model for one order.
    #[tracing::instrument(skip(self, events), fields(events = events.len()))]
    pub async fn project(
        &self,
        aggregate_id: AggregateId,
        events: &[EventEnvelope],
    ) -> Result<Option<OrderModel>> {
        let current = self.read_models.get(aggregate_id).await?;
        let model = fold(&self.projection, current, events)?;

        if let Some(model) = &model {
            self.read_models.put(model.clone()).await?;
        }

        metrics::counter!("projection_events_applied_total").increment(events.len() as u64);
        Ok(model)
    }

    /// Rebuilds one order's model from its full stream.
    ///
    /// Returns None if the stream does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn catch_up(&self, aggregate_id: AggregateId) -> Result<Option<OrderModel>> {
        let Some(slice) = self.store.try_read_stream(aggregate_id).await? else {
            return Ok(None);
        };

        let model = fold(&self.projection, None, &slice.events)?;
        if let Some(model) = &model {
            self.read_models.put(model.clone()).await?;
        }

        metrics::counter!("projection_events_applied_total")
            .increment(slice.events.len() as u64);
        tracing::info!(version = %slice.version, "read model caught up");

        Ok(model)
    }

    /// Replays every event in the store and rewrites all order models.
    ///
    /// Events of other aggregate types are skipped. Returns the number of
    /// models written.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<usize> {
        let mut stream = self.store.stream_all_events().await?;
        let mut models: HashMap<AggregateId, OrderModel> = HashMap::new();
        let mut applied: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            if event.aggregate_type != Order::aggregate_type() {
                tracing::debug!(aggregate_type = %event.aggregate_type, "skipping event");
                continue;
            }

            let current = models.remove(&event.aggregate_id);
            let model = self.projection.apply(&event, current)?;
            models.insert(event.aggregate_id, model);
            applied += 1;
        }

        let count = models.len();
        for model in models.into_values() {
            self.read_models.put(model).await?;
        }

        metrics::counter!("projection_events_applied_total").increment(applied);
        tracing::info!(
            projection = self.projection.name(),
            events_applied = applied,
            models = count,
            "rebuild complete"
        );

        Ok(count)
    }
}
