use crate::utils::error::CoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

/// History record created after a successful execution. Immutable once
/// written; there is no update path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: Uuid,
    pub user_id: Uuid,
    pub data_source_id: Uuid,
    pub name: String,
    pub sql: String,
    pub result_metadata: Value,
    pub execution_time_ms: u64,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSavedQuery {
    pub user_id: Uuid,
    pub data_source_id: Uuid,
    pub name: String,
    pub sql: String,
    pub result_metadata: Value,
    pub execution_time_ms: u64,
    pub row_count: usize,
}

/// Persistence seam for query history. The surrounding application provides
/// a durable implementation; `InMemoryQueryStore` backs tests and embedded
/// use.
#[async_trait]
pub trait SavedQueryStore: Send + Sync {
    async fn insert(&self, query: NewSavedQuery) -> Result<SavedQuery, CoreError>;
    async fn list_for_source(
        &self,
        data_source_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<SavedQuery>, CoreError>;
}

#[derive(Default)]
pub struct InMemoryQueryStore {
    rows: RwLock<Vec<SavedQuery>>,
}

impl InMemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SavedQueryStore for InMemoryQueryStore {
    async fn insert(&self, query: NewSavedQuery) -> Result<SavedQuery, CoreError> {
        let saved = SavedQuery {
            id: Uuid::new_v4(),
            user_id: query.user_id,
            data_source_id: query.data_source_id,
            name: query.name,
            sql: query.sql,
            result_metadata: query.result_metadata,
            execution_time_ms: query.execution_time_ms,
            row_count: query.row_count,
            created_at: Utc::now(),
        };
        self.rows.write().await.push(saved.clone());
        Ok(saved)
    }

    async fn list_for_source(
        &self,
        data_source_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<SavedQuery>, CoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|q| q.data_source_id == data_source_id && q.user_id == user_id)
            .cloned()
            .collect())
    }
}
