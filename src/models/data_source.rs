use crate::utils::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The closed set of supported engines. MariaDB speaks the MySQL wire
/// protocol and shares its connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    MySql,
    MariaDb,
    PostgreSql,
}

impl FromStr for EngineType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(EngineType::MySql),
            "mariadb" => Ok(EngineType::MariaDb),
            "postgresql" | "postgres" => Ok(EngineType::PostgreSql),
            other => Err(CoreError::UnsupportedEngine(other.to_string())),
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineType::MySql => "mysql",
            EngineType::MariaDb => "mariadb",
            EngineType::PostgreSql => "postgresql",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceStatus {
    Active,
    Inactive,
    Error,
}

/// A configured external database connection owned by a user. The
/// `connection_config` is either an encrypted base64 string (at rest) or an
/// already-decoded JSON object (transient, e.g. during setup flows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: Uuid,
    pub name: String,
    pub engine: EngineType,
    pub connection_config: Value,
    pub status: DataSourceStatus,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
}

impl DataSource {
    pub fn new(name: &str, engine: EngineType, connection_config: Value, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            engine,
            connection_config,
            status: DataSourceStatus::Inactive,
            last_tested_at: None,
            user_id,
        }
    }
}
