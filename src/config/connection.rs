//! Warehouse connection profiles.
//!
//! Supports configuration via environment variables:
//! - `INGEST_DB_HOST`: Warehouse hostname
//! - `INGEST_DB_PORT`: Port (optional, default 8123)
//! - `INGEST_DB_NAME`: Database name (optional, default `default`)
//! - `INGEST_DB_USER`: User name (optional, default `default`)
//! - `INGEST_DB_CREDENTIAL`: Access token or password

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::settings::{expand_env_vars, SettingsError};
use crate::source::RelationalSource;

/// Default HTTP port of the warehouse.
pub const DEFAULT_PORT: u16 = 8123;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

/// A named warehouse connection from the settings file.
///
/// ```toml
/// [connections.analytics]
/// host = "ch.internal"
/// port = 8443
/// database = "events"
/// user = "loader"
/// credential = "${CH_TOKEN}"
/// ```
#[derive(Clone, Deserialize, Serialize)]
pub struct ConnectionProfile {
    /// Server hostname (supports ${ENV_VAR} expansion).
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_name")]
    pub database: String,

    /// User name.
    #[serde(default = "default_name")]
    pub user: String,

    /// Access token or password (supports ${ENV_VAR} expansion).
    #[serde(default)]
    pub credential: String,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_name() -> String {
    "default".to_string()
}

impl ConnectionProfile {
    /// Resolve the profile into a source, expanding environment variables.
    pub fn resolve(&self) -> Result<RelationalSource, SettingsError> {
        Ok(RelationalSource::new(
            expand_env_vars(&self.host)?,
            self.port,
            expand_env_vars(&self.database)?,
            expand_env_vars(&self.user)?,
            expand_env_vars(&self.credential)?,
        ))
    }
}

/// Load a warehouse source from environment variables.
///
/// Required:
/// - `INGEST_DB_HOST`
/// - `INGEST_DB_CREDENTIAL`
///
/// Optional:
/// - `INGEST_DB_PORT`, `INGEST_DB_NAME`, `INGEST_DB_USER`
pub fn source_from_env() -> Result<RelationalSource, ConnectionError> {
    let host = env::var("INGEST_DB_HOST")
        .map_err(|_| ConnectionError::MissingEnvVar("INGEST_DB_HOST".to_string()))?;

    let credential = env::var("INGEST_DB_CREDENTIAL")
        .map_err(|_| ConnectionError::MissingEnvVar("INGEST_DB_CREDENTIAL".to_string()))?;

    let port = match env::var("INGEST_DB_PORT") {
        Ok(p) => p.parse().map_err(|_| ConnectionError::InvalidPort(p))?,
        Err(_) => DEFAULT_PORT,
    };

    let database = env::var("INGEST_DB_NAME").unwrap_or_else(|_| default_name());
    let user = env::var("INGEST_DB_USER").unwrap_or_else(|_| default_name());

    Ok(RelationalSource::new(host, port, database, user, credential))
}
