//! Read model views maintained by projections.

mod order_model;

pub use order_model::OrderModelProjection;
