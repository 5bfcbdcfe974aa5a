//! Domain error types.

use common::AggregateId;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A command was rejected by the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A stream cannot be folded into an aggregate.
    #[error("Invalid stream {aggregate_id}: {reason}")]
    InvalidStream {
        aggregate_id: AggregateId,
        reason: String,
    },

    /// An event payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An envelope could not be built.
    #[error("Envelope error: {0}")]
    Envelope(#[from] event_store::EventStoreError),
}
