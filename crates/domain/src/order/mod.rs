//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod value_objects;

pub use aggregate::Order;
pub use commands::OrderCommand;
pub use events::{OrderCancelledData, OrderCreatedData, OrderEvent, OrderPaidData, OrderShippedData};
pub use value_objects::{Money, ParseMoneyError};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The order's current state forbids the command.
    #[error("Invalid state transition: cannot {action}, {reason}")]
    InvalidTransition {
        action: &'static str,
        reason: &'static str,
    },

    /// Orders cannot be opened with a negative total.
    #[error("Invalid total: {total} (must not be negative)")]
    NegativeTotal { total: Money },

    /// A command name did not match any known command.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}
