//! Caller-facing error taxonomy.

use common::AggregateId;
use domain::{DomainError, OrderError};
use event_store::{EventStoreError, Version};
use projections::ProjectionError;
use thiserror::Error;

/// Broad class of a [`ServiceError`], for transports that map errors to
/// status codes without matching on inner types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Unavailable,
    Internal,
}

/// Errors returned by [`crate::OrderService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The order does not exist.
    #[error("Order not found: {0}")]
    NotFound(AggregateId),

    /// An order with this id already exists.
    #[error("Order already exists: {0}")]
    AlreadyExists(AggregateId),

    /// The caller's view of the order is stale. Never retried here.
    #[error("Concurrency conflict on {aggregate_id}: expected version {expected}, actual {actual}")]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The command breaks an order rule. Nothing was written.
    #[error("Invalid transition: {0}")]
    InvalidTransition(OrderError),

    /// The request itself is malformed, such as a negative total or an
    /// unknown command name.
    #[error("Invalid input: {0}")]
    InvalidInput(OrderError),

    /// The read model received events out of sequence.
    #[error("Projection out of order for {aggregate_id} at version {version}")]
    ProjectionOutOfOrder {
        aggregate_id: AggregateId,
        version: Version,
    },

    /// A backing store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Corrupt data or an invariant broken inside the engine.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::AlreadyExists(_) | ServiceError::ConcurrencyConflict { .. } => {
                ErrorKind::Conflict
            }
            ServiceError::InvalidTransition(_) | ServiceError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            ServiceError::StoreUnavailable(_) => ErrorKind::Unavailable,
            ServiceError::ProjectionOutOfOrder { .. } | ServiceError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns the HTTP status code equivalent.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::InvalidInput => 400,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<EventStoreError> for ServiceError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::StreamNotFound(id) => ServiceError::NotFound(id),
            EventStoreError::StreamAlreadyExists(id) => ServiceError::AlreadyExists(id),
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => ServiceError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            },
            err if err.is_unavailable() => ServiceError::StoreUnavailable(err.to_string()),
            err => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<OrderError> for ServiceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { .. } => ServiceError::InvalidTransition(err),
            OrderError::NegativeTotal { .. } | OrderError::UnknownCommand(_) => {
                ServiceError::InvalidInput(err)
            }
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Order(err) => err.into(),
            DomainError::Envelope(err) => err.into(),
            err => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<ProjectionError> for ServiceError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::OutOfOrder {
                aggregate_id,
                version,
                ..
            } => ServiceError::ProjectionOutOfOrder {
                aggregate_id,
                version,
            },
            ProjectionError::EventStore(err) => err.into(),
            err if err.is_unavailable() => ServiceError::StoreUnavailable(err.to_string()),
            err => ServiceError::Internal(err.to_string()),
        }
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
