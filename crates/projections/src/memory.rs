use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use tokio::sync::RwLock;

use crate::Result;
use crate::read_model::{OrderModel, ReadModelStore};

/// In-memory read model store.
#[derive(Clone, Default)]
pub struct InMemoryReadModelStore {
    models: Arc<RwLock<HashMap<AggregateId, OrderModel>>>,
}

impl InMemoryReadModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored models.
    pub async fn len(&self) -> usize {
        self.models.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.models.read().await.is_empty()
    }
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    async fn get(&self, id: AggregateId) -> Result<Option<OrderModel>> {
        Ok(self.models.read().await.get(&id).cloned())
    }

    #[tracing::instrument(skip(self, model), fields(order_id = %model.id, version = %model.version))]
    async fn put(&self, model: OrderModel) -> Result<()> {
        let mut models = self.models.write().await;
        match models.get(&model.id) {
            Some(stored) if stored.version >= model.version => {
                tracing::debug!(stored = %stored.version, "dropping stale read model");
            }
            _ => {
                models.insert(model.id, model);
            }
        }
        Ok(())
    }
}
