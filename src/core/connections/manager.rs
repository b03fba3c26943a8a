use crate::models::{DataSource, DataSourceStatus, EngineType};
use crate::utils::crypto::ConfigCipher;
use crate::utils::datasource::{
    factory, DataSourceConnector, QueryOutput, TableSchema, TestOutcome,
};
use crate::utils::error::CoreError;
use chrono::Utc;
use serde_json::Value;

type ConnectorResolver =
    dyn Fn(EngineType, &Value) -> Result<Box<dyn DataSourceConnector>, CoreError> + Send + Sync;

/// Resolves data sources to connectors, decrypting stored configuration on
/// the way. Every operation is a single attempt; failures are wrapped and
/// returned, never retried.
pub struct ConnectionManager {
    cipher: ConfigCipher,
    resolver: Box<ConnectorResolver>,
}

impl ConnectionManager {
    pub fn new(cipher: ConfigCipher) -> Self {
        Self {
            cipher,
            resolver: Box::new(factory::create_connector),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_resolver(cipher: ConfigCipher, resolver: Box<ConnectorResolver>) -> Self {
        Self { cipher, resolver }
    }

    /// A stored config is an encrypted base64 string; a config still in
    /// flight from a setup flow is a plain JSON object. Both are accepted.
    pub fn decrypt_config(&self, data_source: &DataSource) -> Result<Value, CoreError> {
        match &data_source.connection_config {
            Value::String(sealed) => {
                let plain = self.cipher.decrypt(sealed).map_err(|e| {
                    CoreError::ConnectionFailure(format!(
                        "could not decrypt connection config: {}",
                        e
                    ))
                })?;
                serde_json::from_slice(&plain).map_err(|e| {
                    CoreError::ConnectionFailure(format!(
                        "decrypted connection config is not valid JSON: {}",
                        e
                    ))
                })
            }
            other => Ok(other.clone()),
        }
    }

    /// Encrypts a plain config object for storage on a `DataSource`.
    pub fn seal_config(&self, config: &Value) -> Result<Value, CoreError> {
        let plain = serde_json::to_vec(config)
            .map_err(|e| CoreError::ConnectionFailure(e.to_string()))?;
        let sealed = self
            .cipher
            .encrypt(&plain)
            .map_err(|e| CoreError::ConnectionFailure(e.to_string()))?;
        Ok(Value::String(sealed))
    }

    pub fn connector_for(
        &self,
        data_source: &DataSource,
    ) -> Result<Box<dyn DataSourceConnector>, CoreError> {
        let config = self.decrypt_config(data_source)?;
        (self.resolver)(data_source.engine, &config)
    }

    /// Probes connectivity and records the outcome on the entity: `active`
    /// plus a fresh `last_tested_at` on success, `error` otherwise. The
    /// caller persists the entity.
    pub async fn test_connection(&self, data_source: &mut DataSource) -> TestOutcome {
        let outcome = match self.connector_for(data_source) {
            Ok(connector) => connector.test_connection().await,
            Err(e) => TestOutcome {
                success: false,
                message: format!("Connection failed: {}", e),
            },
        };

        if outcome.success {
            data_source.status = DataSourceStatus::Active;
            data_source.last_tested_at = Some(Utc::now());
        } else {
            data_source.status = DataSourceStatus::Error;
        }
        outcome
    }

    pub async fn get_schema(&self, data_source: &DataSource) -> Result<Vec<TableSchema>, CoreError> {
        let connector = self.connector_for(data_source)?;
        connector.fetch_schema().await
    }

    pub async fn execute_query(
        &self,
        data_source: &DataSource,
        sql: &str,
    ) -> Result<QueryOutput, CoreError> {
        let connector = self.connector_for(data_source)?;
        connector.execute_query(sql).await
    }
}
