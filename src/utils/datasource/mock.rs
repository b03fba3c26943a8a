//! Scripted connector used by unit tests across the crate. Results are
//! consumed in FIFO order; cloning shares the underlying script so a test
//! can keep a handle while the resolver hands clones to the services.

use super::base::{
    ColumnSchema, ConfigField, DataSourceConnector, QueryOutput, Relationship, Row, TableSchema,
    TestOutcome,
};
use super::mysql;
use crate::utils::error::CoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockConnector {
    reachable: bool,
    tables: Vec<TableSchema>,
    relationships: Vec<Relationship>,
    failing_tables: HashSet<String>,
    results: Arc<Mutex<VecDeque<Result<QueryOutput, CoreError>>>>,
}

impl MockConnector {
    pub fn healthy() -> Self {
        Self {
            reachable: true,
            tables: Vec::new(),
            relationships: Vec::new(),
            failing_tables: HashSet::new(),
            results: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::healthy()
        }
    }

    pub fn with_tables(mut self, tables: Vec<TableSchema>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_relationships(mut self, relationships: Vec<Relationship>) -> Self {
        self.relationships = relationships;
        self
    }

    /// Column introspection for this table will fail, everything else works.
    pub fn with_failing_table(mut self, table: &str) -> Self {
        self.failing_tables.insert(table.to_string());
        self
    }

    pub fn push_rows(self, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        self.results
            .lock()
            .unwrap()
            .push_back(Ok(QueryOutput { data: rows, row_count }));
        self
    }

    pub fn push_error(self, error: CoreError) -> Self {
        self.results.lock().unwrap().push_back(Err(error));
        self
    }
}

/// Builds one result row from column/value pairs.
pub fn row(pairs: Vec<(&str, Value)>) -> Row {
    let mut record = Row::new();
    for (name, value) in pairs {
        record.insert(name.to_string(), value);
    }
    record
}

pub fn column(name: &str, data_type: &str) -> ColumnSchema {
    ColumnSchema {
        name: name.to_string(),
        data_type: data_type.to_string(),
        nullable: true,
        key: None,
    }
}

pub fn table(name: &str, columns: Vec<ColumnSchema>) -> TableSchema {
    TableSchema {
        name: name.to_string(),
        comment: None,
        columns,
    }
}

#[async_trait]
impl DataSourceConnector for MockConnector {
    async fn test_connection(&self) -> TestOutcome {
        if self.reachable {
            TestOutcome {
                success: true,
                message: "Connection successful".to_string(),
            }
        } else {
            TestOutcome {
                success: false,
                message: "connection refused".to_string(),
            }
        }
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryOutput, CoreError> {
        if !self.reachable {
            return Err(CoreError::ConnectionFailure("connection refused".to_string()));
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutput::default()))
    }

    async fn fetch_schema(&self) -> Result<Vec<TableSchema>, CoreError> {
        if !self.reachable {
            return Err(CoreError::ConnectionFailure("connection refused".to_string()));
        }
        Ok(self.tables.clone())
    }

    async fn list_tables(&self) -> Result<Vec<String>, CoreError> {
        if !self.reachable {
            return Err(CoreError::ConnectionFailure("connection refused".to_string()));
        }
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnSchema>, CoreError> {
        if self.failing_tables.contains(table) {
            return Err(CoreError::ExecutionFailure(format!(
                "permission denied for table {}",
                table
            )));
        }
        self.tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| CoreError::ExecutionFailure(format!("unknown table {}", table)))
    }

    async fn foreign_keys(&self) -> Result<Vec<Relationship>, CoreError> {
        if !self.reachable {
            return Err(CoreError::ConnectionFailure("connection refused".to_string()));
        }
        Ok(self.relationships.clone())
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        mysql::config_fields()
    }
}
