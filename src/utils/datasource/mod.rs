pub mod base;
pub mod factory;
#[cfg(test)]
pub mod mock;
pub mod mysql;
pub mod postgres;

pub use base::{
    ColumnSchema, ConfigField, ConfigInputKind, DataSourceConnector, QueryOutput, Relationship,
    Row, SelectOption, TableSchema, TestOutcome, QUERY_TIMEOUT,
};
pub use factory::{config_fields_for, create_connector};
