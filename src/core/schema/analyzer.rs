use super::relevance::RankingPolicy;
use crate::core::connections::ConnectionManager;
use crate::models::DataSource;
use crate::utils::cache::TtlCache;
use crate::utils::datasource::{ColumnSchema, Relationship, Row};
use crate::utils::error::CoreError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Normalized table → ordered columns map used to ground prompt
/// construction.
pub type SchemaMap = BTreeMap<String, Vec<ColumnSchema>>;

pub const SCHEMA_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Sources with more tables than this get relevance-filtered before column
/// introspection.
pub const MAX_SCHEMA_TABLES: usize = 50;

pub struct SchemaAnalyzer {
    manager: Arc<ConnectionManager>,
    ranking: RankingPolicy,
    schema_cache: TtlCache<SchemaMap>,
    relationship_cache: TtlCache<Vec<Relationship>>,
}

impl SchemaAnalyzer {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self::with_caches(
            manager,
            TtlCache::new(SCHEMA_CACHE_TTL),
            TtlCache::new(SCHEMA_CACHE_TTL),
        )
    }

    pub fn with_caches(
        manager: Arc<ConnectionManager>,
        schema_cache: TtlCache<SchemaMap>,
        relationship_cache: TtlCache<Vec<Relationship>>,
    ) -> Self {
        Self {
            manager,
            ranking: RankingPolicy::default(),
            schema_cache,
            relationship_cache,
        }
    }

    /// Cached schema map for a data source. A table whose column
    /// introspection fails is logged and skipped: partial schema is valid
    /// output and must not abort the whole fetch.
    pub async fn schema_context(&self, data_source: &DataSource) -> Result<SchemaMap, CoreError> {
        let cache_key = format!("schema:{}", data_source.id);
        self.schema_cache
            .remember(&cache_key, || async {
                let connector = self.manager.connector_for(data_source)?;

                let mut tables = connector.list_tables().await?;
                if tables.len() > MAX_SCHEMA_TABLES {
                    tracing::info!(
                        data_source_id = %data_source.id,
                        total = tables.len(),
                        keeping = MAX_SCHEMA_TABLES,
                        "wide schema, ranking tables by relevance"
                    );
                    tables = self.ranking.rank_tables(&tables, MAX_SCHEMA_TABLES);
                }

                let mut schema = SchemaMap::new();
                for table in &tables {
                    match connector.table_columns(table).await {
                        Ok(columns) => {
                            schema.insert(table.clone(), columns);
                        }
                        Err(e) => {
                            tracing::warn!(
                                table = %table,
                                error = %e,
                                "skipping table, column introspection failed"
                            );
                        }
                    }
                }
                Ok(schema)
            })
            .await
    }

    /// Foreign-key edges for the source, cached separately from the schema
    /// map. Detection failures degrade to an empty list.
    pub async fn table_relationships(&self, data_source: &DataSource) -> Vec<Relationship> {
        let cache_key = format!("relationships:{}", data_source.id);
        let result: Result<Vec<Relationship>, CoreError> = self
            .relationship_cache
            .remember(&cache_key, || async {
                let connector = self.manager.connector_for(data_source)?;
                connector.foreign_keys().await
            })
            .await;

        match result {
            Ok(relationships) => relationships,
            Err(e) => {
                tracing::warn!(data_source_id = %data_source.id, error = %e, "relationship detection failed");
                Vec::new()
            }
        }
    }

    /// Uncached passthrough used for previews; the table name comes from
    /// the introspected schema, not from user input.
    pub async fn sample_data(
        &self,
        data_source: &DataSource,
        table: &str,
        limit: usize,
    ) -> Result<Vec<Row>, CoreError> {
        let connector = self.manager.connector_for(data_source)?;
        let output = connector
            .execute_query(&format!("SELECT * FROM {} LIMIT {}", table, limit))
            .await?;
        Ok(output.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineType;
    use crate::utils::crypto::ConfigCipher;
    use crate::utils::datasource::mock::{column, table, MockConnector};
    use serde_json::json;
    use uuid::Uuid;

    fn manager_with(mock: MockConnector) -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::with_resolver(
            ConfigCipher::new(ConfigCipher::generate_key()),
            Box::new(move |_, _| Ok(Box::new(mock.clone()))),
        ))
    }

    fn test_source() -> DataSource {
        DataSource::new(
            "db",
            EngineType::MySql,
            json!({"host": "h", "database": "d"}),
            Uuid::new_v4(),
        )
    }

    fn analyzer_without_caching(mock: MockConnector) -> SchemaAnalyzer {
        SchemaAnalyzer::with_caches(manager_with(mock), TtlCache::disabled(), TtlCache::disabled())
    }

    #[tokio::test]
    async fn failing_table_is_skipped_not_fatal() {
        let mock = MockConnector::healthy()
            .with_tables(vec![
                table("bookings", vec![column("id", "int"), column("total", "decimal")]),
                table("guests", vec![column("id", "int")]),
            ])
            .with_failing_table("guests");

        let analyzer = analyzer_without_caching(mock);
        let schema = analyzer.schema_context(&test_source()).await.unwrap();

        assert_eq!(schema.len(), 1);
        assert!(schema.contains_key("bookings"));
    }

    #[tokio::test]
    async fn schema_is_cached_per_data_source() {
        let mock = MockConnector::healthy()
            .with_tables(vec![table("orders", vec![column("id", "int")])]);
        let analyzer = SchemaAnalyzer::new(manager_with(mock));
        let source = test_source();

        let first = analyzer.schema_context(&source).await.unwrap();
        let second = analyzer.schema_context(&source).await.unwrap();
        assert_eq!(first, second);

        let (hits, misses) = analyzer.schema_cache.stats().await;
        assert_eq!((hits, misses), (1, 1));
    }

    #[tokio::test]
    async fn wide_schema_is_capped_by_relevance() {
        let mut tables: Vec<_> = (0..60)
            .map(|i| table(&format!("scratch_{:02}", i), vec![column("id", "int")]))
            .collect();
        tables.push(table("reservations", vec![column("total", "decimal")]));

        let analyzer = analyzer_without_caching(MockConnector::healthy().with_tables(tables));
        let schema = analyzer.schema_context(&test_source()).await.unwrap();

        assert_eq!(schema.len(), MAX_SCHEMA_TABLES);
        assert!(schema.contains_key("reservations"));
    }

    #[tokio::test]
    async fn relationship_failures_degrade_to_empty() {
        let analyzer = analyzer_without_caching(MockConnector::unreachable());
        assert!(analyzer.table_relationships(&test_source()).await.is_empty());
    }
}
