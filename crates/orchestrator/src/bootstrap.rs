//! Connection setup for the PostgreSQL backend.

use event_store::{EventStoreError, PostgresEventStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::Config;

/// Errors raised while preparing the PostgreSQL backend.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,

    #[error("Failed to connect: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    Migrate(#[from] EventStoreError),
}

/// Opens a pool against `DATABASE_URL` and applies pending migrations.
#[tracing::instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn connect_postgres(config: &Config) -> Result<PgPool, BootstrapError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(BootstrapError::MissingDatabaseUrl)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await?;

    PostgresEventStore::new(pool.clone()).run_migrations().await?;
    tracing::info!("database ready");

    Ok(pool)
}
