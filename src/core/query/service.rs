use super::validator::{append_limit, sanitize_error_message, validate_query};
use crate::core::connections::ConnectionManager;
use crate::models::{DataSource, NewSavedQuery, SavedQuery, SavedQueryStore};
use crate::utils::datasource::Row;
use crate::utils::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_ROW_LIMIT: usize = 1000;
pub const MAX_ROW_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    pub inferred_type: String,
}

/// Successful execution output. `limited` is a heuristic: the row count
/// equalling the cap usually means more rows exist, but can false-positive
/// when the true count coincides with the cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub data: Vec<Row>,
    pub columns: Vec<ResultColumn>,
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub limited: bool,
}

/// Failed execution, with the message already sanitized for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
    pub execution_time_ms: u64,
}

impl From<QueryError> for CoreError {
    fn from(e: QueryError) -> Self {
        CoreError::ExecutionFailure(e.message)
    }
}

pub struct QueryService {
    manager: Arc<ConnectionManager>,
    store: Arc<dyn SavedQueryStore>,
}

impl QueryService {
    pub fn new(manager: Arc<ConnectionManager>, store: Arc<dyn SavedQueryStore>) -> Self {
        Self { manager, store }
    }

    /// Validates, caps and runs a query against the source. The validator
    /// runs here unconditionally so no call path can reach a connector with
    /// unchecked SQL.
    pub async fn execute_query(
        &self,
        data_source: &DataSource,
        sql: &str,
        limit: Option<usize>,
    ) -> Result<QueryResult, QueryError> {
        let start = Instant::now();
        let limit = limit.unwrap_or(DEFAULT_ROW_LIMIT).clamp(1, MAX_ROW_LIMIT);

        if let Err(e) = validate_query(sql) {
            return Err(QueryError {
                message: e.to_string(),
                execution_time_ms: start.elapsed().as_millis() as u64,
            });
        }

        let capped_sql = append_limit(sql, limit);
        match self.manager.execute_query(data_source, &capped_sql).await {
            Ok(output) => {
                let execution_time_ms = start.elapsed().as_millis() as u64;
                Ok(QueryResult {
                    columns: extract_columns(&output.data),
                    row_count: output.row_count,
                    limited: output.row_count == limit,
                    data: output.data,
                    execution_time_ms,
                })
            }
            Err(e) => {
                tracing::error!(
                    data_source_id = %data_source.id,
                    error = %e,
                    "query execution failed"
                );
                Err(QueryError {
                    message: sanitize_error_message(&e.to_string()),
                    execution_time_ms: start.elapsed().as_millis() as u64,
                })
            }
        }
    }

    /// Plain persistence; callers have already decided the record is worth
    /// keeping.
    pub async fn save_query(&self, query: NewSavedQuery) -> Result<SavedQuery, CoreError> {
        self.store.insert(query).await
    }

    pub fn store(&self) -> Arc<dyn SavedQueryStore> {
        Arc::clone(&self.store)
    }
}

/// Display types come from the first row only, not a full-column scan.
pub fn extract_columns(data: &[Row]) -> Vec<ResultColumn> {
    let Some(first_row) = data.first() else {
        return Vec::new();
    };
    first_row
        .iter()
        .map(|(name, value)| ResultColumn {
            name: name.clone(),
            inferred_type: infer_value_type(value).to_string(),
        })
        .collect()
}

pub fn infer_value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "float"
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.parse::<f64>().is_ok() {
                "numeric"
            } else if looks_like_datetime(trimmed) {
                "datetime"
            } else {
                "string"
            }
        }
        Value::Array(_) | Value::Object(_) => "string",
    }
}

fn looks_like_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
