//! Command side of the order engine.
//!
//! [`OrderService`] reads an order's stream, lets the aggregate decide,
//! appends with optimistic concurrency, then brings the read model up to
//! date. Errors are reported through the [`ServiceError`] taxonomy.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use bootstrap::{BootstrapError, connect_postgres};
pub use config::{Config, LogFormat};
pub use error::{ErrorKind, Result, ServiceError};
pub use service::OrderService;
pub use telemetry::{CommandOutcome, ProjectionFailure, Telemetry, init_tracing};
