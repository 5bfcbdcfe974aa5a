use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{EventStore, EventStream, StreamSlice, validate_events_for_append},
};

#[derive(Default)]
struct Inner {
    /// Every event in commit order.
    log: Vec<EventEnvelope>,
    /// Per-stream events in version order.
    streams: HashMap<AggregateId, Vec<EventEnvelope>>,
}

impl Inner {
    fn version_of(&self, aggregate_id: AggregateId) -> Option<Version> {
        self.streams
            .get(&aggregate_id)
            .map(|events| Version::new(events.len() as i64))
    }

    fn commit(&mut self, aggregate_id: AggregateId, events: Vec<EventEnvelope>) -> Version {
        self.log.extend(events.iter().cloned());
        let stream = self.streams.entry(aggregate_id).or_default();
        stream.extend(events);
        Version::new(stream.len() as i64)
    }
}

/// In-memory event store implementation.
///
/// Provides the same guarantees as the PostgreSQL implementation: the version
/// check and the write happen under a single write lock, so an append is
/// either fully visible or not at all.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, event), fields(aggregate_id = %event.aggregate_id))]
    async fn append_initial(&self, event: EventEnvelope) -> Result<Version> {
        let aggregate_id = event.aggregate_id;
        validate_events_for_append(
            aggregate_id,
            Version::initial(),
            std::slice::from_ref(&event),
        )?;

        let mut inner = self.inner.write().await;
        if inner.streams.contains_key(&aggregate_id) {
            return Err(EventStoreError::StreamAlreadyExists(aggregate_id));
        }

        let version = inner.commit(aggregate_id, vec![event]);
        metrics::counter!("event_store_appends_total").increment(1);
        Ok(version)
    }

    async fn read_stream(&self, aggregate_id: AggregateId) -> Result<StreamSlice> {
        let inner = self.inner.read().await;
        let events = inner
            .streams
            .get(&aggregate_id)
            .cloned()
            .ok_or(EventStoreError::StreamNotFound(aggregate_id))?;

        Ok(StreamSlice {
            version: Version::new(events.len() as i64),
            events,
        })
    }

    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append_expected(
        &self,
        aggregate_id: AggregateId,
        expected: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version> {
        validate_events_for_append(aggregate_id, expected, &events)?;

        let mut inner = self.inner.write().await;
        let actual = inner
            .version_of(aggregate_id)
            .ok_or(EventStoreError::StreamNotFound(aggregate_id))?;

        if actual != expected {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            });
        }

        let version = inner.commit(aggregate_id, events);
        metrics::counter!("event_store_appends_total").increment(1);
        Ok(version)
    }

    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.inner.read().await.version_of(aggregate_id))
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.inner.read().await.log.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}
