//! Conversion between domain events and stored envelopes.

use common::AggregateId;
use event_store::{EventEnvelope, StreamSlice, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Wraps new events for an append to a stream currently at `current_version`.
///
/// Envelope versions continue from `current_version`; timestamps come from
/// the events themselves.
pub fn encode<A: Aggregate>(
    aggregate_id: AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, DomainError> {
    let mut envelopes = Vec::with_capacity(events.len());
    let mut version = current_version;

    for event in events {
        version = version.next();
        let envelope = EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(version)
            .timestamp(event.occurred_at())
            .payload(event)?
            .build()?;
        envelopes.push(envelope);
    }

    Ok(envelopes)
}

/// Decodes the domain event carried by an envelope.
pub fn decode<E: DomainEvent>(envelope: &EventEnvelope) -> Result<E, DomainError> {
    Ok(serde_json::from_value(envelope.payload.clone())?)
}

/// Rebuilds an aggregate from a whole stream.
///
/// Fails with [`DomainError::InvalidStream`] if the folded version does not
/// match the stream's version, which means the slice has gaps.
pub fn load<A: Aggregate>(
    aggregate_id: AggregateId,
    slice: &StreamSlice,
) -> Result<A, DomainError> {
    let events = slice
        .events
        .iter()
        .map(decode::<A::Event>)
        .collect::<Result<Vec<_>, _>>()?;

    let aggregate = A::replay(aggregate_id, &events)?;
    if aggregate.version() != slice.version {
        return Err(DomainError::InvalidStream {
            aggregate_id,
            reason: format!(
                "folded to version {} but stream is at {}",
                aggregate.version(),
                slice.version
            ),
        });
    }

    Ok(aggregate)
}
