use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow, types::Json};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, Result, Version,
    store::{EventStore, EventStream, StreamSlice, validate_events_for_append},
};

const UNIQUE_VERSION_CONSTRAINT: &str = "unique_aggregate_version";

/// PostgreSQL-backed event store implementation.
///
/// Appends run inside one transaction. The `(aggregate_id, version)` unique
/// constraint is the final arbiter when two writers pass the version check
/// at the same time.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    fn is_version_violation(error: &sqlx::Error) -> bool {
        if let sqlx::Error::Database(db_err) = error
            && db_err.constraint() == Some(UNIQUE_VERSION_CONSTRAINT)
        {
            return true;
        }
        false
    }

    async fn insert_event(
        tx: &mut Transaction<'_, Postgres>,
        event: &EventEnvelope,
    ) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(&event.event_type)
        .bind(event.aggregate_id.as_uuid())
        .bind(&event.aggregate_type)
        .bind(event.version.as_i64())
        .bind(event.timestamp)
        .bind(&event.payload)
        .bind(Json(&event.metadata))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn current_version(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: AggregateId,
    ) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&mut **tx)
                .await?;

        Ok(version.map(Version::new))
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, event), fields(aggregate_id = %event.aggregate_id))]
    async fn append_initial(&self, event: EventEnvelope) -> Result<Version> {
        let aggregate_id = event.aggregate_id;
        validate_events_for_append(
            aggregate_id,
            Version::initial(),
            std::slice::from_ref(&event),
        )?;

        let mut tx = self.pool.begin().await?;
        Self::insert_event(&mut tx, &event).await.map_err(|e| {
            if Self::is_version_violation(&e) {
                EventStoreError::StreamAlreadyExists(aggregate_id)
            } else {
                EventStoreError::Database(e)
            }
        })?;
        tx.commit().await?;

        metrics::counter!("event_store_appends_total").increment(1);
        Ok(Version::first())
    }

    #[tracing::instrument(skip(self))]
    async fn read_stream(&self, aggregate_id: AggregateId) -> Result<StreamSlice> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
            FROM events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(EventStoreError::StreamNotFound(aggregate_id));
        }

        let events = rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?;

        Ok(StreamSlice {
            version: Version::new(events.len() as i64),
            events,
        })
    }

    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append_expected(
        &self,
        aggregate_id: AggregateId,
        expected: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version> {
        validate_events_for_append(aggregate_id, expected, &events)?;

        let mut tx = self.pool.begin().await?;

        let actual = Self::current_version(&mut tx, aggregate_id)
            .await?
            .ok_or(EventStoreError::StreamNotFound(aggregate_id))?;

        if actual != expected {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            });
        }

        let mut last_version = expected;
        for event in &events {
            match Self::insert_event(&mut tx, event).await {
                Ok(()) => last_version = event.version,
                Err(e) if Self::is_version_violation(&e) => {
                    // The winner has committed by now; report the stream's
                    // real version rather than the slot we lost.
                    tx.rollback().await?;
                    metrics::counter!("event_store_conflicts_total").increment(1);
                    let actual = self
                        .stream_version(aggregate_id)
                        .await?
                        .unwrap_or(event.version);
                    return Err(EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected,
                        actual,
                    });
                }
                Err(e) => return Err(EventStoreError::Database(e)),
            }
        }

        tx.commit().await?;
        metrics::counter!("event_store_appends_total").increment(1);
        Ok(last_version)
    }

    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
            FROM events
            ORDER BY position ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(EventStoreError::Database(e)),
        });

        Ok(Box::pin(stream))
    }
}
