use super::base::{ConfigField, DataSourceConnector};
use super::mysql::{self, MySqlConnector};
use super::postgres::{self, PostgresConnector};
use crate::models::EngineType;
use crate::utils::error::CoreError;
use serde_json::Value;

/// Single resolution point from engine type to connector. The supported set
/// is small and closed; there is no runtime registration.
pub fn create_connector(
    engine: EngineType,
    config: &Value,
) -> Result<Box<dyn DataSourceConnector>, CoreError> {
    match engine {
        EngineType::MySql | EngineType::MariaDb => Ok(Box::new(MySqlConnector::new(config)?)),
        EngineType::PostgreSql => Ok(Box::new(PostgresConnector::new(config)?)),
    }
}

/// Configuration form descriptors for an engine, available without a live
/// connection.
pub fn config_fields_for(engine: EngineType) -> Vec<ConfigField> {
    match engine {
        EngineType::MySql | EngineType::MariaDb => mysql::config_fields(),
        EngineType::PostgreSql => postgres::config_fields(),
    }
}
