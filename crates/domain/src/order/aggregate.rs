//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::Serialize;

use crate::aggregate::Aggregate;

use super::{Money, OrderCommand, OrderCreatedData, OrderError, OrderEvent};

/// Order aggregate root.
///
/// Rebuilt from its event stream for every command and never stored.
/// `is_paid` and `is_cancelled` may both hold (cancel after payment);
/// `is_shipped` and `is_cancelled` never do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    id: AggregateId,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_paid: bool,
    is_shipped: bool,
    is_cancelled: bool,
    version: Version,
}

impl Order {
    /// Builds the event that opens a new order stream.
    pub fn open(
        order_id: AggregateId,
        total: Money,
        at: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        if total.is_negative() {
            return Err(OrderError::NegativeTotal { total });
        }
        Ok(OrderEvent::order_created(order_id, total, at))
    }

    /// State right after the creation event.
    pub fn create(data: &OrderCreatedData) -> Self {
        Self {
            id: data.order_id,
            total: data.total,
            created_at: data.created_at,
            updated_at: data.created_at,
            is_paid: false,
            is_shipped: false,
            is_cancelled: false,
            version: Version::first(),
        }
    }
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn initial(event: &Self::Event) -> Option<Self> {
        match event {
            OrderEvent::OrderCreated(data) => Some(Self::create(data)),
            _ => None,
        }
    }

    fn apply(&self, event: &Self::Event) -> Self {
        let mut next = Self {
            version: self.version.next(),
            ..self.clone()
        };

        match event {
            // A stream is opened once; a repeated creation fact changes nothing.
            OrderEvent::OrderCreated(_) => {}
            OrderEvent::OrderPaid(data) => {
                next.is_paid = true;
                next.updated_at = data.paid_at;
            }
            OrderEvent::OrderShipped(data) => {
                next.is_shipped = true;
                next.updated_at = data.shipped_at;
            }
            OrderEvent::OrderCancelled(data) => {
                next.is_cancelled = true;
                next.updated_at = data.cancelled_at;
            }
        }

        next
    }

    fn handle(
        &self,
        command: &OrderCommand,
        at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match command {
            OrderCommand::CompletePayment => self.complete_payment(at),
            OrderCommand::Ship => self.ship(at),
            OrderCommand::Cancel => self.cancel(at),
        }
    }
}

// Query methods
impl Order {
    /// Returns the order total.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn is_shipped(&self) -> bool {
        self.is_shipped
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }
}

// Command methods (return events)
impl Order {
    /// Records payment. A no-op once paid or shipped.
    pub fn complete_payment(&self, at: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_cancelled {
            return Err(OrderError::InvalidTransition {
                action: "complete payment",
                reason: "order is cancelled",
            });
        }
        if self.is_paid || self.is_shipped {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::order_paid(self.id, at)])
    }

    /// Records shipment. Payment is not required first.
    pub fn ship(&self, at: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_cancelled {
            return Err(OrderError::InvalidTransition {
                action: "ship",
                reason: "order is cancelled",
            });
        }
        if self.is_shipped {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::order_shipped(self.id, at)])
    }

    /// Cancels the order unless it has shipped.
    pub fn cancel(&self, at: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_shipped {
            return Err(OrderError::InvalidTransition {
                action: "cancel",
                reason: "order has shipped",
            });
        }
        if self.is_cancelled {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::order_cancelled(self.id, at)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_order() -> Order {
        let id = AggregateId::new();
        let event = Order::open(id, Money::from_cents(10_000), Utc::now()).unwrap();
        Order::initial(&event).unwrap()
    }

    fn run(order: &Order, command: OrderCommand) -> (Order, Vec<OrderEvent>) {
        order.execute(&command, Utc::now()).unwrap()
    }

    #[test]
    fn test_create_order() {
        let order = create_order();
        assert_eq!(order.total(), Money::from_cents(10_000));
        assert_eq!(order.version(), Version::first());
        assert_eq!(order.created_at(), order.updated_at());
        assert!(!order.is_paid());
        assert!(!order.is_shipped());
        assert!(!order.is_cancelled());
    }

    #[test]
    fn test_open_rejects_negative_total() {
        let result = Order::open(AggregateId::new(), Money::from_cents(-1), Utc::now());
        assert!(matches!(result, Err(OrderError::NegativeTotal { .. })));
    }

    #[test]
    fn test_open_accepts_zero_total() {
        assert!(Order::open(AggregateId::new(), Money::zero(), Utc::now()).is_ok());
    }

    #[test]
    fn test_complete_payment() {
        let order = create_order();
        let (paid, events) = run(&order, OrderCommand::CompletePayment);

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OrderEvent::OrderPaid(_)));
        assert!(paid.is_paid());
        assert_eq!(paid.version(), Version::new(2));
        assert!(!order.is_paid());
    }

    #[test]
    fn test_complete_payment_twice_is_noop() {
        let (paid, _) = run(&create_order(), OrderCommand::CompletePayment);
        let (again, events) = run(&paid, OrderCommand::CompletePayment);

        assert!(events.is_empty());
        assert_eq!(again, paid);
    }

    #[test]
    fn test_complete_payment_after_ship_is_noop() {
        let (shipped, _) = run(&create_order(), OrderCommand::Ship);
        let (_, events) = run(&shipped, OrderCommand::CompletePayment);
        assert!(events.is_empty());
    }

    #[test]
    fn test_ship_before_payment_is_allowed() {
        let (shipped, events) = run(&create_order(), OrderCommand::Ship);
        assert_eq!(events.len(), 1);
        assert!(shipped.is_shipped());
        assert!(!shipped.is_paid());
    }

    #[test]
    fn test_ship_twice_is_noop() {
        let (shipped, _) = run(&create_order(), OrderCommand::Ship);
        let (_, events) = run(&shipped, OrderCommand::Ship);
        assert!(events.is_empty());
    }

    #[test]
    fn test_cancel_order() {
        let (cancelled, events) = run(&create_order(), OrderCommand::Cancel);
        assert!(matches!(events[0], OrderEvent::OrderCancelled(_)));
        assert!(cancelled.is_cancelled());
    }

    #[test]
    fn test_cancel_twice_is_noop() {
        let (cancelled, _) = run(&create_order(), OrderCommand::Cancel);
        let (_, events) = run(&cancelled, OrderCommand::Cancel);
        assert!(events.is_empty());
    }

    #[test]
    fn test_cancel_after_payment_keeps_paid() {
        let (paid, _) = run(&create_order(), OrderCommand::CompletePayment);
        let (cancelled, _) = run(&paid, OrderCommand::Cancel);
        assert!(cancelled.is_paid());
        assert!(cancelled.is_cancelled());
    }

    #[test]
    fn test_cannot_cancel_shipped_order() {
        let (shipped, _) = run(&create_order(), OrderCommand::Ship);
        let result = shipped.handle(&OrderCommand::Cancel, Utc::now());
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition { action: "cancel", .. })
        ));
    }

    #[test]
    fn test_cancelled_order_rejects_payment_and_shipping() {
        let (cancelled, _) = run(&create_order(), OrderCommand::Cancel);
        assert!(cancelled.handle(&OrderCommand::CompletePayment, Utc::now()).is_err());
        assert!(cancelled.handle(&OrderCommand::Ship, Utc::now()).is_err());
    }

    #[test]
    fn test_paid_then_cancelled_rejects_payment() {
        let (paid, _) = run(&create_order(), OrderCommand::CompletePayment);
        let (cancelled, _) = run(&paid, OrderCommand::Cancel);

        let result = cancelled.handle(&OrderCommand::CompletePayment, Utc::now());
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition { action: "complete payment", .. })
        ));
    }

    #[test]
    fn test_duplicate_created_event_only_advances_version() {
        let order = create_order();
        let duplicate = OrderEvent::order_created(order.id(), Money::from_cents(1), Utc::now());

        let next = order.apply(&duplicate);
        assert_eq!(next.total(), order.total());
        assert_eq!(next.version(), order.version().next());
    }

    #[test]
    fn test_shipped_and_cancelled_never_coexist() {
        let commands = [
            OrderCommand::CompletePayment,
            OrderCommand::Ship,
            OrderCommand::Cancel,
        ];

        // Every command sequence of length 4.
        for n in 0..commands.len().pow(4) {
            let mut order = create_order();
            let mut was_cancelled = false;
            let mut idx = n;

            for _ in 0..4 {
                let command = commands[idx % commands.len()];
                idx /= commands.len();

                if let Ok((next, _)) = order.execute(&command, Utc::now()) {
                    order = next;
                }
                assert!(!(order.is_shipped() && order.is_cancelled()));
                assert!(!was_cancelled || order.is_cancelled());
                was_cancelled = order.is_cancelled();
            }
        }
    }
}
