use super::base::{
    append_url_param, build_connection_url, ColumnSchema, ConfigField, ConfigInputKind,
    DataSourceConnector, QueryOutput, Relationship, Row, SelectOption, TableSchema, TestOutcome,
    QUERY_TIMEOUT,
};
use crate::utils::error::CoreError;
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as SqlxRow};
use std::time::Duration;

pub struct PostgresConnector {
    connection_string: String,
    schema: String,
}

impl PostgresConnector {
    pub fn new(config: &Value) -> Result<Self, CoreError> {
        let schema = config
            .get("schema")
            .and_then(|v| v.as_str())
            .unwrap_or("public")
            .to_string();

        let mut connection_string = build_connection_url(config, "postgres", 5432, "postgres")?;

        match config.get("sslmode").and_then(|v| v.as_str()) {
            Some(mode) if !mode.is_empty() => {
                append_url_param(&mut connection_string, "sslmode", mode);
            }
            _ => {}
        }

        Ok(Self {
            connection_string,
            schema,
        })
    }

    async fn create_pool(&self) -> Result<PgPool, CoreError> {
        PgPoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Some(Duration::from_secs(30)))
            .connect(&self.connection_string)
            .await
            .map_err(|e| CoreError::ConnectionFailure(e.to_string()))
    }

    async fn fetch_all(&self, pool: &PgPool, sql: &str) -> Result<Vec<PgRow>, CoreError> {
        match tokio::time::timeout(QUERY_TIMEOUT, sqlx::query(sql).fetch_all(pool)).await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => Err(CoreError::ExecutionFailure(e.to_string())),
            Err(_) => Err(CoreError::ExecutionFailure(format!(
                "query timed out after {} seconds",
                QUERY_TIMEOUT.as_secs()
            ))),
        }
    }

    async fn columns_with_pool(
        &self,
        pool: &PgPool,
        table: &str,
    ) -> Result<Vec<ColumnSchema>, CoreError> {
        // Key classification mirrors the MySQL COLUMN_KEY convention so the
        // normalized shape is engine-independent.
        let rows = sqlx::query(
            "SELECT c.column_name,
                    c.data_type,
                    c.is_nullable,
                    COALESCE((
                        SELECT CASE tc.constraint_type
                                   WHEN 'PRIMARY KEY' THEN 'PRI'
                                   WHEN 'FOREIGN KEY' THEN 'MUL'
                                   WHEN 'UNIQUE' THEN 'UNI'
                                   ELSE ''
                               END
                        FROM information_schema.key_column_usage kcu
                        JOIN information_schema.table_constraints tc
                          ON kcu.constraint_name = tc.constraint_name
                         AND kcu.table_schema = tc.table_schema
                        WHERE kcu.table_schema = c.table_schema
                          AND kcu.table_name = c.table_name
                          AND kcu.column_name = c.column_name
                        ORDER BY CASE tc.constraint_type
                                     WHEN 'PRIMARY KEY' THEN 0
                                     WHEN 'UNIQUE' THEN 1
                                     ELSE 2
                                 END
                        LIMIT 1
                    ), '') AS column_key
             FROM information_schema.columns c
             WHERE c.table_schema = $1 AND c.table_name = $2
             ORDER BY c.ordinal_position",
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| CoreError::ExecutionFailure(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| {
                let key: String = row.get("column_key");
                ColumnSchema {
                    name: row.get("column_name"),
                    data_type: row.get("data_type"),
                    nullable: row.get::<String, _>("is_nullable") == "YES",
                    key: if key.is_empty() { None } else { Some(key) },
                }
            })
            .collect())
    }
}

fn decode_cell(row: &PgRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(idx) {
        return v.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null);
    }
    Value::Null
}

fn rows_to_output(rows: Vec<PgRow>) -> QueryOutput {
    let mut data = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut record = Row::new();
        for (idx, column) in row.columns().iter().enumerate() {
            record.insert(column.name().to_string(), decode_cell(row, idx));
        }
        data.push(record);
    }
    let row_count = data.len();
    QueryOutput { data, row_count }
}

#[async_trait]
impl DataSourceConnector for PostgresConnector {
    async fn test_connection(&self) -> TestOutcome {
        let pool = match self.create_pool().await {
            Ok(pool) => pool,
            Err(e) => {
                return TestOutcome {
                    success: false,
                    message: e.to_string(),
                }
            }
        };

        let outcome = match sqlx::query("SELECT 1").fetch_one(&pool).await {
            Ok(_) => TestOutcome {
                success: true,
                message: "Connection successful".to_string(),
            },
            Err(e) => TestOutcome {
                success: false,
                message: e.to_string(),
            },
        };
        pool.close().await;
        outcome
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryOutput, CoreError> {
        let pool = self.create_pool().await?;
        let result = self.fetch_all(&pool, sql).await.map(rows_to_output);
        pool.close().await;
        result
    }

    async fn fetch_schema(&self) -> Result<Vec<TableSchema>, CoreError> {
        let pool = self.create_pool().await?;

        let table_rows = sqlx::query(
            "SELECT t.table_name,
                    obj_description(pgc.oid, 'pg_class') AS table_comment
             FROM information_schema.tables t
             JOIN pg_catalog.pg_class pgc ON pgc.relname = t.table_name
             WHERE t.table_schema = $1 AND t.table_type = 'BASE TABLE'
             ORDER BY t.table_name",
        )
        .bind(&self.schema)
        .fetch_all(&pool)
        .await
        .map_err(|e| CoreError::ExecutionFailure(e.to_string()))?;

        let mut tables = Vec::with_capacity(table_rows.len());
        for row in &table_rows {
            let name: String = row.get("table_name");
            let comment: Option<String> = row.try_get("table_comment").ok().flatten();
            let columns = self.columns_with_pool(&pool, &name).await?;
            tables.push(TableSchema {
                name,
                comment: comment.filter(|c| !c.is_empty()),
                columns,
            });
        }

        pool.close().await;
        Ok(tables)
    }

    async fn list_tables(&self) -> Result<Vec<String>, CoreError> {
        let pool = self.create_pool().await?;
        let rows = sqlx::query(
            "SELECT table_name
             FROM information_schema.tables
             WHERE table_schema = $1 AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .bind(&self.schema)
        .fetch_all(&pool)
        .await
        .map_err(|e| CoreError::ExecutionFailure(e.to_string()))?;

        let tables = rows.iter().map(|r| r.get("table_name")).collect();
        pool.close().await;
        Ok(tables)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnSchema>, CoreError> {
        let pool = self.create_pool().await?;
        let columns = self.columns_with_pool(&pool, table).await;
        pool.close().await;
        columns
    }

    async fn foreign_keys(&self) -> Result<Vec<Relationship>, CoreError> {
        let pool = self.create_pool().await?;
        let rows = sqlx::query(
            "SELECT tc.table_name,
                    kcu.column_name,
                    ccu.table_name AS referenced_table_name,
                    ccu.column_name AS referenced_column_name
             FROM information_schema.table_constraints tc
             JOIN information_schema.key_column_usage kcu
               ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
             JOIN information_schema.constraint_column_usage ccu
               ON ccu.constraint_name = tc.constraint_name
              AND ccu.table_schema = tc.table_schema
             WHERE tc.constraint_type = 'FOREIGN KEY'
               AND tc.table_schema = $1",
        )
        .bind(&self.schema)
        .fetch_all(&pool)
        .await
        .map_err(|e| CoreError::ExecutionFailure(e.to_string()))?;

        let relationships = rows
            .iter()
            .map(|row| Relationship {
                from_table: row.get("table_name"),
                from_column: row.get("column_name"),
                to_table: row.get("referenced_table_name"),
                to_column: row.get("referenced_column_name"),
            })
            .collect();
        pool.close().await;
        Ok(relationships)
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        config_fields()
    }
}

pub fn config_fields() -> Vec<ConfigField> {
    let ssl_options = ["disable", "require", "verify-ca", "verify-full"]
        .iter()
        .map(|mode| SelectOption {
            value: mode.to_string(),
            label: {
                let mut label = mode.replace('-', " ");
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                label
            },
        })
        .collect();

    vec![
        ConfigField::new("host", "Host", ConfigInputKind::Text, true).with_default("localhost"),
        ConfigField::new("port", "Port", ConfigInputKind::Number, true).with_default("5432"),
        ConfigField::new("database", "Database", ConfigInputKind::Text, true),
        ConfigField::new("username", "Username", ConfigInputKind::Text, true),
        ConfigField::new("password", "Password", ConfigInputKind::Password, false),
        ConfigField::new("schema", "Schema", ConfigInputKind::Text, false).with_default("public"),
        ConfigField::new("sslmode", "SSL Mode", ConfigInputKind::Select, false)
            .with_default("disable")
            .with_options(ssl_options),
    ]
}
