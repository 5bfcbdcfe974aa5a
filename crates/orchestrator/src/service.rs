//! Order command orchestration: read, decide, append, project.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::AggregateId;
use domain::{Aggregate, Money, Order, OrderCommand, envelope};
use event_store::{EventEnvelope, EventStore, StreamSlice, Version};
use projections::{OrderModel, ProjectionProcessor, ReadModelStore};

use crate::error::{Result, ServiceError};
use crate::telemetry::{CommandOutcome, ProjectionFailure, Telemetry};

/// Entry point for order commands and queries.
///
/// Each command rebuilds the order from its stream, decides, and appends
/// with the caller's expected version. No lock is held between the read
/// and the append; the version check is the only coordination, and a lost
/// race is reported, never retried. Share the service through an `Arc`.
pub struct OrderService<S: EventStore, R: ReadModelStore> {
    store: Arc<S>,
    processor: ProjectionProcessor<S, R>,
    telemetry: Telemetry,
}

impl<S: EventStore, R: ReadModelStore> OrderService<S, R> {
    /// Creates a new order service over the given stores.
    pub fn new(store: S, read_models: R, telemetry: Telemetry) -> Self {
        let store = Arc::new(store);
        let processor = ProjectionProcessor::new(Arc::clone(&store), Arc::new(read_models));

        Self {
            store,
            processor,
            telemetry,
        }
    }

    /// Opens a new order stream. Returns the new version (always 1).
    #[tracing::instrument(skip(self, total), fields(total = %total))]
    pub async fn create_order(&self, order_id: AggregateId, total: Money) -> Result<Version> {
        let event = Order::open(order_id, total, Utc::now())?;
        let envelopes =
            envelope::encode::<Order>(order_id, Version::initial(), std::slice::from_ref(&event))?;
        let first = envelopes
            .first()
            .cloned()
            .ok_or_else(|| ServiceError::Internal("no creation event encoded".to_string()))?;

        let version = self.store.append_initial(first).await?;
        self.telemetry.order_created();
        tracing::info!(%order_id, "order created");

        self.update_read_model(order_id, &envelopes).await;
        Ok(version)
    }

    /// Runs a command against an order the caller has seen at `expected_version`.
    ///
    /// Returns the stream version after the command; a no-op returns the
    /// current version unchanged.
    #[tracing::instrument(skip(self, command), fields(command = %command))]
    pub async fn submit_command(
        &self,
        order_id: AggregateId,
        expected_version: Version,
        command: OrderCommand,
    ) -> Result<Version> {
        let started = Instant::now();
        let result = self.run_command(order_id, expected_version, command).await;

        let outcome = match &result {
            Ok((_, true)) => CommandOutcome::Applied,
            Ok((_, false)) => CommandOutcome::NoOp,
            Err(err) => CommandOutcome::from_error(err),
        };
        self.telemetry
            .command_finished(command, outcome, started.elapsed());

        match &result {
            Ok((version, _)) => {
                tracing::info!(%order_id, %version, outcome = outcome.as_str(), "command handled")
            }
            Err(err) => {
                tracing::warn!(%order_id, error = %err, outcome = outcome.as_str(), "command failed")
            }
        }

        result.map(|(version, _)| version)
    }

    /// Returns the read model of an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<OrderModel> {
        self.processor
            .read_models()
            .get(order_id)
            .await?
            .ok_or(ServiceError::NotFound(order_id))
    }

    /// Rebuilds an order straight from its event stream.
    #[tracing::instrument(skip(self))]
    pub async fn load_order(&self, order_id: AggregateId) -> Result<Order> {
        let slice = self.store.read_stream(order_id).await?;
        Ok(envelope::load(order_id, &slice)?)
    }

    /// Returns the raw event stream of an order.
    pub async fn order_events(&self, order_id: AggregateId) -> Result<StreamSlice> {
        Ok(self.store.read_stream(order_id).await?)
    }

    /// Rewrites one order's read model from its full stream.
    pub async fn catch_up(&self, order_id: AggregateId) -> Result<OrderModel> {
        self.processor
            .catch_up(order_id)
            .await?
            .ok_or(ServiceError::NotFound(order_id))
    }

    /// Rewrites every read model from the event log.
    pub async fn rebuild_read_models(&self) -> Result<usize> {
        Ok(self.processor.rebuild_all().await?)
    }

    /// Returns the new version and whether anything was appended.
    async fn run_command(
        &self,
        order_id: AggregateId,
        expected_version: Version,
        command: OrderCommand,
    ) -> Result<(Version, bool)> {
        let slice = self.store.read_stream(order_id).await?;
        if slice.version != expected_version {
            return Err(ServiceError::ConcurrencyConflict {
                aggregate_id: order_id,
                expected: expected_version,
                actual: slice.version,
            });
        }

        let order: Order = envelope::load(order_id, &slice)?;
        let (next, events) = order.execute(&command, Utc::now())?;
        if events.is_empty() {
            tracing::debug!(%order_id, "command changed nothing");
            return Ok((slice.version, false));
        }

        let envelopes = envelope::encode::<Order>(order_id, slice.version, &events)?;
        let version = self
            .store
            .append_expected(order_id, expected_version, envelopes.clone())
            .await?;
        debug_assert_eq!(version, next.version());

        self.update_read_model(order_id, &envelopes).await;
        Ok((version, true))
    }

    /// Folds committed events into the read model.
    ///
    /// The events are already durable, so a failure here does not fail the
    /// command: it is logged, counted, and repaired by replaying the stream.
    async fn update_read_model(&self, order_id: AggregateId, envelopes: &[EventEnvelope]) {
        let Err(error) = self.processor.project(order_id, envelopes).await else {
            return;
        };

        let failure = ProjectionFailure::from_error(&error);
        self.telemetry.projection_failed(failure);
        tracing::error!(
            %order_id,
            %error,
            reason = failure.as_str(),
            "read model update failed, catching up"
        );

        if let Err(error) = self.processor.catch_up(order_id).await {
            tracing::error!(%order_id, %error, "read model catch-up failed");
        }
    }
}
