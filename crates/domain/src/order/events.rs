//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::Money;

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created.
    OrderCreated(OrderCreatedData),

    /// Payment for the order was completed.
    OrderPaid(OrderPaidData),

    /// Order was shipped.
    OrderShipped(OrderShippedData),

    /// Order was cancelled.
    OrderCancelled(OrderCancelledData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::OrderPaid(_) => "OrderPaid",
            OrderEvent::OrderShipped(_) => "OrderShipped",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(data) => data.created_at,
            OrderEvent::OrderPaid(data) => data.paid_at,
            OrderEvent::OrderShipped(data) => data.shipped_at,
            OrderEvent::OrderCancelled(data) => data.cancelled_at,
        }
    }
}

impl OrderEvent {
    /// Returns the order the event belongs to.
    pub fn order_id(&self) -> AggregateId {
        match self {
            OrderEvent::OrderCreated(data) => data.order_id,
            OrderEvent::OrderPaid(data) => data.order_id,
            OrderEvent::OrderShipped(data) => data.order_id,
            OrderEvent::OrderCancelled(data) => data.order_id,
        }
    }
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    /// The unique order ID.
    pub order_id: AggregateId,

    /// Order total at creation.
    pub total: Money,

    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// Data for OrderPaid event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidData {
    pub order_id: AggregateId,

    /// When the payment completed.
    pub paid_at: DateTime<Utc>,
}

/// Data for OrderShipped event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShippedData {
    pub order_id: AggregateId,

    /// When the order left the warehouse.
    pub shipped_at: DateTime<Utc>,
}

/// Data for OrderCancelled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub order_id: AggregateId,

    /// When the order was cancelled.
    pub cancelled_at: DateTime<Utc>,
}

// Convenience constructors for events
impl OrderEvent {
    /// Creates an OrderCreated event.
    pub fn order_created(order_id: AggregateId, total: Money, created_at: DateTime<Utc>) -> Self {
        OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            total,
            created_at,
        })
    }

    /// Creates an OrderPaid event.
    pub fn order_paid(order_id: AggregateId, paid_at: DateTime<Utc>) -> Self {
        OrderEvent::OrderPaid(OrderPaidData { order_id, paid_at })
    }

    /// Creates an OrderShipped event.
    pub fn order_shipped(order_id: AggregateId, shipped_at: DateTime<Utc>) -> Self {
        OrderEvent::OrderShipped(OrderShippedData {
            order_id,
            shipped_at,
        })
    }

    /// Creates an OrderCancelled event.
    pub fn order_cancelled(order_id: AggregateId, cancelled_at: DateTime<Utc>) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            order_id,
            cancelled_at,
        })
    }
}
