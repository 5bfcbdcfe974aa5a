//! Append-only event log with per-stream optimistic concurrency.
//!
//! A stream is the ordered list of events that share one [`AggregateId`].
//! Its length is its [`Version`], and every append names the version it
//! expects to find. Two adapters implement [`EventStore`]:
//! [`InMemoryEventStore`] and [`PostgresEventStore`].

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{EventStore, EventStoreExt, EventStream, StreamSlice, validate_events_for_append};
