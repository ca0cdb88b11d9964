//! TOML-based configuration.
//!
//! Supports a config file (ingest-bridge.toml) with environment variable
//! expansion in connection profiles.
//!
//! Example configuration:
//! ```toml
//! [service]
//! base_url = "http://localhost:8000"
//! timeout_seconds = 30
//!
//! [ingest]
//! output_delimiter = ","
//!
//! [connections.default]
//! host = "localhost"
//! port = 8123
//! credential = "${CH_TOKEN}"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::ConnectionProfile;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Ingestion service endpoint.
    pub service: ServiceSettings,

    /// Ingestion defaults.
    pub ingest: IngestSettings,

    /// Named warehouse connections.
    pub connections: HashMap<String, ConnectionProfile>,
}

/// Ingestion service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Base URL of the service.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,

    /// TCP connect timeout in seconds.
    pub connect_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

/// Ingestion defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Delimiter written by warehouse → file ingestion.
    pub output_delimiter: String,

    /// Delimiter assumed for flat files when none is given.
    pub default_delimiter: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            output_delimiter: ",".to_string(),
            default_delimiter: ",".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `INGEST_BRIDGE_CONFIG`
    /// 2. `./ingest-bridge.toml`
    /// 3. `~/.config/ingest-bridge/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("INGEST_BRIDGE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("ingest-bridge.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ingest-bridge").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionProfile, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    /// Get the default connection ("default" if it exists, else the only one).
    pub fn default_connection(&self) -> Option<(&str, &ConnectionProfile)> {
        if let Some(conn) = self.connections.get("default") {
            return Some(("default", conn));
        }
        if self.connections.len() == 1 {
            return self.connections.iter().next().map(|(k, v)| (k.as_str(), v));
        }
        None
    }

    fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("ingest.output_delimiter", &self.ingest.output_delimiter),
            ("ingest.default_delimiter", &self.ingest.default_delimiter),
        ] {
            if value.chars().count() != 1 {
                return Err(SettingsError::InvalidConfig(format!(
                    "{} must be a single character, got {:?}",
                    name, value
                )));
            }
        }
        if self.service.base_url.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "service.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept
/// as is.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let pattern = Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z0-9_]+)")
        .map_err(|e| SettingsError::InvalidConfig(e.to_string()))?;

    let mut expanded = String::with_capacity(s.len());
    let mut rest = 0;
    for caps in pattern.captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        let value = env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()))?;

        expanded.push_str(&s[rest..whole.start()]);
        expanded.push_str(&value);
        rest = whole.end();
    }
    expanded.push_str(&s[rest..]);

    Ok(expanded)
}
