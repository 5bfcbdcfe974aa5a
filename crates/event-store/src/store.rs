use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// The events of one stream together with the version they add up to.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSlice {
    /// Events in version order (oldest first).
    pub events: Vec<EventEnvelope>,

    /// Current version of the stream, equal to the number of events.
    pub version: Version,
}

/// Core trait for event store implementations.
///
/// Streams are append-only. Readers observe a stream either before or after
/// an append, never part of one. All implementations must be thread-safe.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Starts a new stream with its first event (sequence 0).
    ///
    /// Fails with `StreamAlreadyExists` if the id is taken. Returns the new
    /// version, which is always [`Version::first`].
    async fn append_initial(&self, event: EventEnvelope) -> Result<Version>;

    /// Reads a whole stream in version order.
    ///
    /// Fails with `StreamNotFound` if the stream does not exist.
    async fn read_stream(&self, aggregate_id: AggregateId) -> Result<StreamSlice>;

    /// Appends events to an existing stream if it is still at `expected`.
    ///
    /// Events are appended atomically - either all succeed or none do.
    /// Fails with `ConcurrencyConflict` if the current version differs from
    /// `expected`. Returns the new version of the stream.
    async fn append_expected(
        &self,
        aggregate_id: AggregateId,
        expected: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version>;

    /// Gets the current version of a stream, or None if it doesn't exist.
    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Streams every committed event in commit order.
    async fn stream_all_events(&self) -> Result<EventStream>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Checks if a stream exists.
    async fn stream_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.stream_version(aggregate_id).await?.is_some())
    }

    /// Reads a stream, mapping a missing stream to `None`.
    async fn try_read_stream(&self, aggregate_id: AggregateId) -> Result<Option<StreamSlice>> {
        match self.read_stream(aggregate_id).await {
            Ok(slice) => Ok(Some(slice)),
            Err(EventStoreError::StreamNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a batch before it is appended to a stream at `expected`.
///
/// The batch must be non-empty, target `aggregate_id` only, share one
/// aggregate type, and carry the versions `expected + 1, expected + 2, ...`.
pub fn validate_events_for_append(
    aggregate_id: AggregateId,
    expected: Version,
    events: &[EventEnvelope],
) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    };

    let mut expected_version = expected;
    for event in events {
        if event.aggregate_id != aggregate_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "All events must belong to stream {aggregate_id}, got {}",
                event.aggregate_id
            )));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidAppend(
                "All events must have the same aggregate type".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "Event versions must be sequential. Expected {}, got {}",
                expected_version, event.version
            )));
        }
    }

    Ok(())
}
