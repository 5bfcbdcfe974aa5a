//! Tracing setup and the metrics handle injected into the service.

use std::time::Duration;

use domain::OrderCommand;
use metrics::{Counter, Histogram};
use projections::ProjectionError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{Config, LogFormat};
use crate::error::{ErrorKind, ServiceError};

/// Installs the global tracing subscriber.
///
/// An invalid `RUST_LOG` directive falls back to `info`. Fails if a
/// subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
}

/// How a command ended, as reported in `order_commands_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOutcome {
    /// Events were appended.
    Applied,
    /// The command was valid but changed nothing.
    NoOp,
    /// The order's rules forbade the command.
    Rejected,
    /// The caller's expected version was stale.
    Conflict,
    NotFound,
    Failed,
}

impl CommandOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandOutcome::Applied => "applied",
            CommandOutcome::NoOp => "noop",
            CommandOutcome::Rejected => "rejected",
            CommandOutcome::Conflict => "conflict",
            CommandOutcome::NotFound => "not_found",
            CommandOutcome::Failed => "failed",
        }
    }

    /// Classifies a failed command.
    pub fn from_error(err: &ServiceError) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => CommandOutcome::Rejected,
            ErrorKind::Conflict => CommandOutcome::Conflict,
            ErrorKind::NotFound => CommandOutcome::NotFound,
            ErrorKind::Unavailable | ErrorKind::Internal => CommandOutcome::Failed,
        }
    }
}

/// Why a read model update failed, as reported in `projection_failures_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionFailure {
    /// Events reached the projection out of sequence. Points at a bug, not
    /// at infrastructure.
    OutOfOrder,
    /// The read model store could not be reached.
    Unavailable,
    Other,
}

impl ProjectionFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionFailure::OutOfOrder => "out_of_order",
            ProjectionFailure::Unavailable => "unavailable",
            ProjectionFailure::Other => "other",
        }
    }

    pub fn from_error(err: &ProjectionError) -> Self {
        match err {
            ProjectionError::OutOfOrder { .. } => ProjectionFailure::OutOfOrder,
            err if err.is_unavailable() => ProjectionFailure::Unavailable,
            _ => ProjectionFailure::Other,
        }
    }
}

/// Metric handles for one engine instance.
///
/// Created once at start-up and handed to [`crate::OrderService`]. With no
/// recorder installed every handle is a no-op.
#[derive(Clone)]
pub struct Telemetry {
    service_name: String,
    orders_created: Counter,
    command_duration: Histogram,
}

impl Telemetry {
    pub fn new(service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();

        Self {
            orders_created: metrics::counter!(
                "orders_created_total",
                "service" => service_name.clone()
            ),
            command_duration: metrics::histogram!(
                "order_command_duration_seconds",
                "service" => service_name.clone()
            ),
            service_name,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.service_name.clone())
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub(crate) fn order_created(&self) {
        self.orders_created.increment(1);
    }

    pub(crate) fn projection_failed(&self, failure: ProjectionFailure) {
        metrics::counter!(
            "projection_failures_total",
            "service" => self.service_name.clone(),
            "reason" => failure.as_str()
        )
        .increment(1);
    }

    pub(crate) fn command_finished(
        &self,
        command: OrderCommand,
        outcome: CommandOutcome,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "order_commands_total",
            "service" => self.service_name.clone(),
            "command" => command.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        self.command_duration.record(elapsed.as_secs_f64());
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;
    use domain::OrderError;
    use event_store::Version;

    #[test]
    fn outcome_follows_error_kind() {
        let id = AggregateId::new();

        let rejected = ServiceError::InvalidTransition(OrderError::InvalidTransition {
            action: "cancel",
            reason: "order has shipped",
        });
        assert_eq!(CommandOutcome::from_error(&rejected), CommandOutcome::Rejected);

        let conflict = ServiceError::ConcurrencyConflict {
            aggregate_id: id,
            expected: Version::new(1),
            actual: Version::new(2),
        };
        assert_eq!(CommandOutcome::from_error(&conflict), CommandOutcome::Conflict);

        let missing = ServiceError::NotFound(id);
        assert_eq!(CommandOutcome::from_error(&missing), CommandOutcome::NotFound);

        let down = ServiceError::StoreUnavailable("pool timed out".into());
        assert_eq!(CommandOutcome::from_error(&down), CommandOutcome::Failed);
    }

    #[test]
    fn projection_failures_keep_ordering_bugs_apart() {
        let out_of_order = ProjectionError::OutOfOrder {
            aggregate_id: AggregateId::new(),
            event_type: "OrderShipped".into(),
            version: Version::new(3),
        };
        assert_eq!(
            ProjectionFailure::from_error(&out_of_order),
            ProjectionFailure::OutOfOrder
        );
        assert_eq!(
            ProjectionFailure::from_error(&out_of_order).as_str(),
            "out_of_order"
        );

        let down = ProjectionError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(
            ProjectionFailure::from_error(&down),
            ProjectionFailure::Unavailable
        );

        let bad_row = ProjectionError::InvalidRow("status".into());
        assert_eq!(
            ProjectionFailure::from_error(&bad_row),
            ProjectionFailure::Other
        );
    }

    #[test]
    fn telemetry_without_recorder_is_inert() {
        let telemetry = Telemetry::from_config(&Config::default());
        assert_eq!(telemetry.service_name(), "order-engine");

        telemetry.order_created();
        telemetry.projection_failed(ProjectionFailure::OutOfOrder);
        telemetry.command_finished(
            OrderCommand::Ship,
            CommandOutcome::Applied,
            Duration::from_millis(3),
        );
    }
}
