//! Projection error types.

use common::AggregateId;
use event_store::Version;
use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An event arrived before the events it depends on.
    #[error("Out-of-order event {event_type} v{version} for {aggregate_id}")]
    OutOfOrder {
        aggregate_id: AggregateId,
        event_type: String,
        version: Version,
    },

    /// The projection does not understand this event.
    #[error("Unsupported event {event_type} on {aggregate_type}")]
    UnsupportedEvent {
        aggregate_type: String,
        event_type: String,
    },

    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// Failed to deserialize an event payload.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The read model store failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored read model row could not be decoded.
    #[error("Invalid read model row: {0}")]
    InvalidRow(String),
}

impl ProjectionError {
    /// True for infrastructure failures as opposed to bad data.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ProjectionError::Database(_) => true,
            ProjectionError::EventStore(e) => e.is_unavailable(),
            _ => false,
        }
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
