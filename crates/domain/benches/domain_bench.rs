use chrono::Utc;
use common::AggregateId;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{Aggregate, Money, Order, OrderCommand, OrderEvent, envelope};
use event_store::{StreamSlice, Version};

/// A stream of `len` events: creation followed by repeated payments.
fn make_stream(order_id: AggregateId, len: usize) -> Vec<OrderEvent> {
    let now = Utc::now();
    let mut events = vec![OrderEvent::order_created(order_id, Money::from_cents(10_000), now)];
    events.extend((1..len).map(|_| OrderEvent::order_paid(order_id, now)));
    events
}

fn bench_handle_command(c: &mut Criterion) {
    let order_id = AggregateId::new();
    let order = Order::replay(order_id, &make_stream(order_id, 1)).unwrap();

    c.bench_function("domain/execute_complete_payment", |b| {
        b.iter(|| {
            order
                .execute(&OrderCommand::CompletePayment, Utc::now())
                .unwrap()
        });
    });
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain/replay");

    for len in [10, 100, 1000] {
        let order_id = AggregateId::new();
        let events = make_stream(order_id, len);

        group.bench_with_input(BenchmarkId::from_parameter(len), &events, |b, events| {
            b.iter(|| Order::replay(order_id, events).unwrap());
        });
    }

    group.finish();
}

fn bench_load_from_envelopes(c: &mut Criterion) {
    let order_id = AggregateId::new();
    let events = make_stream(order_id, 100);
    let slice = StreamSlice {
        events: envelope::encode::<Order>(order_id, Version::initial(), &events).unwrap(),
        version: Version::new(100),
    };

    c.bench_function("domain/load_100_envelopes", |b| {
        b.iter(|| envelope::load::<Order>(order_id, &slice).unwrap());
    });
}

criterion_group!(
    benches,
    bench_handle_command,
    bench_replay,
    bench_load_from_envelopes
);
criterion_main!(benches);
