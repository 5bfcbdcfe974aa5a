//! Shared types for the order engine crates.

mod types;

pub use types::AggregateId;
