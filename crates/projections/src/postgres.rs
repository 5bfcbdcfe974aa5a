use async_trait::async_trait;
use common::AggregateId;
use domain::Money;
use event_store::Version;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::Result;
use crate::read_model::{OrderModel, OrderStatus, ReadModelStore};

/// PostgreSQL-backed read model store over the `order_models` table.
///
/// The upsert only overwrites a row when the incoming version is newer.
#[derive(Clone)]
pub struct PostgresReadModelStore {
    pool: PgPool,
}

impl PostgresReadModelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_model(row: PgRow) -> Result<OrderModel> {
        let status: String = row.try_get("status")?;

        Ok(OrderModel {
            id: AggregateId::from_uuid(row.try_get::<Uuid, _>("id")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status.parse()?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }
}

#[async_trait]
impl ReadModelStore for PostgresReadModelStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: AggregateId) -> Result<Option<OrderModel>> {
        let row = sqlx::query(
            r#"
            SELECT id, total_cents, status, updated_at, version
            FROM order_models
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_model).transpose()
    }

    #[tracing::instrument(skip(self, model), fields(order_id = %model.id, version = %model.version))]
    async fn put(&self, model: OrderModel) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO order_models (id, total_cents, status, updated_at, version)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET total_cents = EXCLUDED.total_cents,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at,
                version = EXCLUDED.version
            WHERE order_models.version < EXCLUDED.version
            "#,
        )
        .bind(model.id.as_uuid())
        .bind(model.total.cents())
        .bind(OrderStatus::as_str(&model.status))
        .bind(model.updated_at)
        .bind(model.version.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("dropping stale read model");
        }

        Ok(())
    }
}
