//! The order read model and the store trait that holds it.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::Money;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::{ProjectionError, Result};

/// Status column of the order read model. Later transitions overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Created,
    Paid,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Created" => Ok(OrderStatus::Created),
            "Paid" => Ok(OrderStatus::Paid),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ProjectionError::InvalidRow(format!(
                "unknown order status {other:?}"
            ))),
        }
    }
}

/// Query-side view of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModel {
    pub id: AggregateId,
    pub total: Money,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
    /// Stream version of the last event applied.
    pub version: Version,
}

/// Point-lookup store for order read models.
///
/// `put` is a monotonic upsert: a model whose version is not newer than the
/// stored row is dropped, so a lagging writer never regresses a row.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    /// Looks up the model for an order.
    async fn get(&self, id: AggregateId) -> Result<Option<OrderModel>>;

    /// Inserts or advances the model for `model.id`.
    async fn put(&self, model: OrderModel) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            OrderStatus::Created,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_invalid_row() {
        let result = "Refunded".parse::<OrderStatus>();
        assert!(matches!(result, Err(ProjectionError::InvalidRow(_))));
    }
}
