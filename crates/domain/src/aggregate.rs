//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;

    /// When the fact happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Trait for aggregates in an event-sourced system.
///
/// State is a value. Folding an event produces a new value and deciding on a
/// command produces events; neither touches storage or mutates `self`, so any
/// number of readers can rebuild the same state from the same log.
pub trait Aggregate: Clone + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The commands this aggregate decides on.
    type Command;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    ///
    /// Used for event store organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    fn id(&self) -> AggregateId;

    /// Returns the stream version this state was folded to.
    fn version(&self) -> Version;

    /// Builds the initial state from the first event of a stream.
    ///
    /// Returns None if the event cannot open a stream.
    fn initial(event: &Self::Event) -> Option<Self>;

    /// Folds one event into the state.
    ///
    /// Must be total and deterministic: events are facts, so folding never
    /// fails.
    fn apply(&self, event: &Self::Event) -> Self;

    /// Decides which events a command produces against the current state.
    ///
    /// An empty vector means the command is a no-op.
    fn handle(
        &self,
        command: &Self::Command,
        at: DateTime<Utc>,
    ) -> Result<Vec<Self::Event>, Self::Error>;

    /// Runs a command and returns the resulting state with the emitted events.
    fn execute(
        &self,
        command: &Self::Command,
        at: DateTime<Utc>,
    ) -> Result<(Self, Vec<Self::Event>), Self::Error> {
        let events = self.handle(command, at)?;
        let state = events.iter().fold(self.clone(), |state, event| state.apply(event));
        Ok((state, events))
    }

    /// Rebuilds an aggregate by folding a whole stream from empty.
    fn replay<'a, I>(aggregate_id: AggregateId, events: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        let mut events = events.into_iter();

        let first = events.next().ok_or_else(|| DomainError::InvalidStream {
            aggregate_id,
            reason: "stream is empty".to_string(),
        })?;

        let initial = Self::initial(first).ok_or_else(|| DomainError::InvalidStream {
            aggregate_id,
            reason: format!("stream starts with {}", first.event_type()),
        })?;

        Ok(events.fold(initial, |state, event| state.apply(event)))
    }
}
