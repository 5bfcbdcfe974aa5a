//! Order engine demo entry point.
//!
//! Walks one order through its lifecycle against the configured backend and
//! logs each step. Uses PostgreSQL when `DATABASE_URL` is set, in-memory
//! stores otherwise.

use common::AggregateId;
use domain::{Money, OrderCommand};
use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use orchestrator::{Config, OrderService, ServiceError, Telemetry, bootstrap, init_tracing};
use projections::{InMemoryReadModelStore, PostgresReadModelStore, ReadModelStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config)?;
    let telemetry = Telemetry::from_config(&config);

    // 2. Pick a backend and run
    if config.uses_postgres() {
        let pool = bootstrap::connect_postgres(&config).await?;
        let service = OrderService::new(
            PostgresEventStore::new(pool.clone()),
            PostgresReadModelStore::new(pool),
            telemetry,
        );
        run_lifecycle(&service).await?;
    } else {
        tracing::info!("DATABASE_URL not set, using in-memory stores");
        let service = OrderService::new(
            InMemoryEventStore::new(),
            InMemoryReadModelStore::new(),
            telemetry,
        );
        run_lifecycle(&service).await?;
    }

    Ok(())
}

/// Create, pay, race a stale cancel, cancel, then try to pay again.
async fn run_lifecycle<S, R>(service: &OrderService<S, R>) -> Result<(), ServiceError>
where
    S: EventStore,
    R: ReadModelStore,
{
    let order_id = AggregateId::new();
    let created = service
        .create_order(order_id, Money::from_cents(10_000))
        .await?;
    let paid = service
        .submit_command(order_id, created, OrderCommand::CompletePayment)
        .await?;

    // A writer still holding the creation version loses.
    if let Err(err) = service
        .submit_command(order_id, created, OrderCommand::Cancel)
        .await
    {
        tracing::info!(error = %err, "stale cancel rejected");
    }

    let cancelled = service
        .submit_command(order_id, paid, OrderCommand::Cancel)
        .await?;

    if let Err(err) = service
        .submit_command(order_id, cancelled, OrderCommand::CompletePayment)
        .await
    {
        tracing::info!(error = %err, "payment after cancellation rejected");
    }

    let model = service.get_order(order_id).await?;
    tracing::info!(
        %order_id,
        status = %model.status,
        total = %model.total,
        version = %model.version,
        "final read model"
    );

    Ok(())
}
