//! Query side of the order engine.
//!
//! - [`Projection`] trait and the [`fold`] helper for turning events into read models
//! - [`OrderModelProjection`], which maintains one [`OrderModel`] per order
//! - [`ReadModelStore`] with in-memory and PostgreSQL adapters
//! - [`ProjectionProcessor`] for incremental updates, per-order catch-up, and full rebuilds

pub mod error;
pub mod memory;
pub mod postgres;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use memory::InMemoryReadModelStore;
pub use postgres::PostgresReadModelStore;
pub use processor::ProjectionProcessor;
pub use projection::{Projection, fold};
pub use read_model::{OrderModel, OrderStatus, ReadModelStore};
pub use views::OrderModelProjection;
