//! Order read model projection.

use chrono::{DateTime, Utc};
use domain::{Aggregate, Order, OrderEvent};
use event_store::{EventEnvelope, Version};

use crate::projection::Projection;
use crate::read_model::{OrderModel, OrderStatus};
use crate::{ProjectionError, Result};

/// Maintains one [`OrderModel`] per order stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderModelProjection;

impl OrderModelProjection {
    pub fn new() -> Self {
        Self
    }
}

impl Projection for OrderModelProjection {
    type Model = OrderModel;

    fn name(&self) -> &'static str {
        "OrderModelProjection"
    }

    fn apply(&self, event: &EventEnvelope, current: Option<OrderModel>) -> Result<OrderModel> {
        if event.aggregate_type != Order::aggregate_type() {
            return Err(ProjectionError::UnsupportedEvent {
                aggregate_type: event.aggregate_type.clone(),
                event_type: event.event_type.clone(),
            });
        }

        let current = match current {
            // Already reflected.
            Some(model) if model.version >= event.version => return Ok(model),
            other => other,
        };

        let expected = current
            .as_ref()
            .map_or(Version::first(), |model| model.version.next());
        if event.version != expected {
            return Err(out_of_order(event));
        }

        let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;

        let model = match (current, order_event) {
            (None, OrderEvent::OrderCreated(data)) => OrderModel {
                id: data.order_id,
                total: data.total,
                status: OrderStatus::Created,
                updated_at: data.created_at,
                version: event.version,
            },
            (None, _) => return Err(out_of_order(event)),
            // A repeated creation fact only advances the version.
            (Some(model), OrderEvent::OrderCreated(_)) => OrderModel {
                version: event.version,
                ..model
            },
            (Some(model), OrderEvent::OrderPaid(data)) => {
                transition(model, OrderStatus::Paid, data.paid_at, event.version)
            }
            (Some(model), OrderEvent::OrderShipped(data)) => {
                transition(model, OrderStatus::Shipped, data.shipped_at, event.version)
            }
            (Some(model), OrderEvent::OrderCancelled(data)) => {
                transition(model, OrderStatus::Cancelled, data.cancelled_at, event.version)
            }
        };

        Ok(model)
    }
}

fn transition(
    model: OrderModel,
    status: OrderStatus,
    at: DateTime<Utc>,
    version: Version,
) -> OrderModel {
    OrderModel {
        status,
        updated_at: at,
        version,
        ..model
    }
}

fn out_of_order(event: &EventEnvelope) -> ProjectionError {
    ProjectionError::OutOfOrder {
        aggregate_id: event.aggregate_id,
        event_type: event.event_type.clone(),
        version: event.version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::fold;
    use common::AggregateId;
    use domain::{Money, envelope};

    fn stream(order_id: AggregateId, events: &[OrderEvent]) -> Vec<EventEnvelope> {
        envelope::encode::<Order>(order_id, Version::initial(), events).unwrap()
    }

    fn created_paid_cancelled(order_id: AggregateId) -> Vec<EventEnvelope> {
        let now = Utc::now();
        stream(
            order_id,
            &[
                OrderEvent::order_created(order_id, Money::from_cents(10_000), now),
                OrderEvent::order_paid(order_id, now),
                OrderEvent::order_cancelled(order_id, now),
            ],
        )
    }

    #[test]
    fn created_opens_model() {
        let order_id = AggregateId::new();
        let events = created_paid_cancelled(order_id);

        let model = OrderModelProjection.apply(&events[0], None).unwrap();

        assert_eq!(model.id, order_id);
        assert_eq!(model.total, Money::from_cents(10_000));
        assert_eq!(model.status, OrderStatus::Created);
        assert_eq!(model.version, Version::first());
        assert_eq!(model.updated_at, events[0].timestamp);
    }

    #[test]
    fn transitions_overwrite_status_and_bump_version() {
        let order_id = AggregateId::new();
        let events = created_paid_cancelled(order_id);

        let paid = fold(&OrderModelProjection, None, &events[..2]).unwrap().unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.version, Version::new(2));

        let cancelled = OrderModelProjection.apply(&events[2], Some(paid)).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.version, Version::new(3));
    }

    #[test]
    fn reapplying_an_event_is_a_no_op() {
        let order_id = AggregateId::new();
        let events = created_paid_cancelled(order_id);
        let model = fold(&OrderModelProjection, None, &events).unwrap().unwrap();

        for event in &events {
            let again = OrderModelProjection.apply(event, Some(model.clone())).unwrap();
            assert_eq!(again, model);
        }
    }

    #[test]
    fn update_without_model_is_out_of_order() {
        let order_id = AggregateId::new();
        let events = created_paid_cancelled(order_id);

        let result = OrderModelProjection.apply(&events[1], None);
        assert!(matches!(
            result,
            Err(ProjectionError::OutOfOrder { version, .. }) if version == Version::new(2)
        ));
    }

    #[test]
    fn gap_is_out_of_order() {
        let order_id = AggregateId::new();
        let events = created_paid_cancelled(order_id);
        let created = OrderModelProjection.apply(&events[0], None).unwrap();

        let result = OrderModelProjection.apply(&events[2], Some(created));
        assert!(matches!(result, Err(ProjectionError::OutOfOrder { .. })));
    }

    #[test]
    fn duplicate_creation_only_advances_version() {
        let order_id = AggregateId::new();
        let now = Utc::now();
        let events = stream(
            order_id,
            &[
                OrderEvent::order_created(order_id, Money::from_cents(100), now),
                OrderEvent::order_created(order_id, Money::from_cents(999), now),
            ],
        );

        let model = fold(&OrderModelProjection, None, &events).unwrap().unwrap();
        assert_eq!(model.total, Money::from_cents(100));
        assert_eq!(model.status, OrderStatus::Created);
        assert_eq!(model.version, Version::new(2));
    }

    #[test]
    fn foreign_aggregate_is_unsupported() {
        let event = EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("Invoice")
            .event_type("InvoiceIssued")
            .version(Version::first())
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap();

        let result = OrderModelProjection.apply(&event, None);
        assert!(matches!(result, Err(ProjectionError::UnsupportedEvent { .. })));
    }

    #[test]
    fn corrupt_payload_is_deserialization_error() {
        let event = EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("Order")
            .event_type("OrderCreated")
            .version(Version::first())
            .payload_raw(serde_json::json!({"type": "OrderCreated", "data": {"total": "lots"}}))
            .build()
            .unwrap();

        let result = OrderModelProjection.apply(&event, None);
        assert!(matches!(result, Err(ProjectionError::Deserialization(_))));
    }
}
