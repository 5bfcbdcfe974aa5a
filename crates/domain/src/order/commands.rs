//! Order commands.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Commands accepted by an existing order.
///
/// Creation is not a command: a stream is opened with [`super::Order::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderCommand {
    /// Record that the order has been paid.
    CompletePayment,

    /// Record that the order has shipped.
    Ship,

    /// Cancel the order.
    Cancel,
}

impl OrderCommand {
    /// Returns the wire name of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderCommand::CompletePayment => "complete-payment",
            OrderCommand::Ship => "ship",
            OrderCommand::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for OrderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderCommand {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete-payment" => Ok(OrderCommand::CompletePayment),
            "ship" => Ok(OrderCommand::Ship),
            "cancel" => Ok(OrderCommand::Cancel),
            other => Err(OrderError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_display() {
        for command in [
            OrderCommand::CompletePayment,
            OrderCommand::Ship,
            OrderCommand::Cancel,
        ] {
            assert_eq!(command.to_string().parse::<OrderCommand>().unwrap(), command);
        }
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = "refund".parse::<OrderCommand>().unwrap_err();
        assert_eq!(err, OrderError::UnknownCommand("refund".to_string()));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&OrderCommand::CompletePayment).unwrap();
        assert_eq!(json, "\"complete-payment\"");
    }
}
