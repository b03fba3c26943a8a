use super::base::{
    append_url_param, build_connection_url, ColumnSchema, ConfigField, ConfigInputKind,
    DataSourceConnector, QueryOutput, Relationship, Row, TableSchema, TestOutcome, QUERY_TIMEOUT,
};
use crate::utils::error::CoreError;
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as SqlxRow};
use std::time::Duration;

/// Connector for MySQL and MariaDB sources. Opens a short-lived pool per
/// call; no connections are held between operations.
pub struct MySqlConnector {
    connection_string: String,
}

impl MySqlConnector {
    pub fn new(config: &Value) -> Result<Self, CoreError> {
        let mut connection_string = build_connection_url(config, "mysql", 3306, "root")?;

        if config.get("ssl").and_then(|v| v.as_bool()).unwrap_or(false) {
            append_url_param(&mut connection_string, "ssl-mode", "REQUIRED");
        }

        Ok(Self { connection_string })
    }

    async fn create_pool(&self) -> Result<MySqlPool, CoreError> {
        MySqlPoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Some(Duration::from_secs(30)))
            .connect(&self.connection_string)
            .await
            .map_err(|e| CoreError::ConnectionFailure(e.to_string()))
    }

    async fn fetch_all(&self, pool: &MySqlPool, sql: &str) -> Result<Vec<MySqlRow>, CoreError> {
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
        pool: &MySqlPool,
        table: &str,
    ) -> Result<Vec<ColumnSchema>, CoreError> {
        let rows = sqlx::query(
            "SELECT COLUMN_NAME as column_name,
                    DATA_TYPE as data_type,
                    IS_NULLABLE as is_nullable,
                    COLUMN_KEY as column_key
             FROM INFORMATION_SCHEMA.COLUMNS
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
             ORDER BY ORDINAL_POSITION",
        )
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

/// Decodes one cell into a JSON value keeping its runtime type. The try
/// chain falls through on driver type mismatches until something decodes.
fn decode_cell(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| json!(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
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
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    Value::Null
}

fn rows_to_output(rows: Vec<MySqlRow>) -> QueryOutput {
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
impl DataSourceConnector for MySqlConnector {
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
            "SELECT TABLE_NAME as table_name, TABLE_COMMENT as table_comment
             FROM INFORMATION_SCHEMA.TABLES
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
             ORDER BY TABLE_NAME",
        )
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
            "SELECT TABLE_NAME as table_name
             FROM INFORMATION_SCHEMA.TABLES
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
             ORDER BY TABLE_NAME",
        )
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
            "SELECT TABLE_NAME as table_name,
                    COLUMN_NAME as column_name,
                    REFERENCED_TABLE_NAME as referenced_table_name,
                    REFERENCED_COLUMN_NAME as referenced_column_name
             FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
             WHERE TABLE_SCHEMA = DATABASE()
               AND REFERENCED_TABLE_NAME IS NOT NULL",
        )
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
    vec![
        ConfigField::new("host", "Host", ConfigInputKind::Text, true).with_default("localhost"),
        ConfigField::new("port", "Port", ConfigInputKind::Number, true).with_default("3306"),
        ConfigField::new("database", "Database", ConfigInputKind::Text, true),
        ConfigField::new("username", "Username", ConfigInputKind::Text, true),
        ConfigField::new("password", "Password", ConfigInputKind::Password, false),
        ConfigField::new("ssl", "Use SSL", ConfigInputKind::Checkbox, false).with_default("false"),
    ]
}
