//! Domain layer for the order engine.
//!
//! This crate provides the pure, storage-free half of event sourcing:
//! - [`Aggregate`] and [`DomainEvent`] traits, with replay from an event stream
//! - [`envelope`] helpers that move domain events in and out of [`event_store::EventEnvelope`]s
//! - The [`Order`] aggregate: its events, commands, and transition rules

pub mod aggregate;
pub mod envelope;
pub mod error;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent};
pub use error::DomainError;
pub use order::{
    Money, Order, OrderCancelledData, OrderCommand, OrderCreatedData, OrderError, OrderEvent,
    OrderPaidData, OrderShippedData, ParseMoneyError,
};
