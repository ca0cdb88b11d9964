//! Configuration module.
//!
//! Handles the settings file, warehouse connection profiles and environment
//! variables.

mod connection;
mod settings;

pub use connection::{source_from_env, ConnectionError, ConnectionProfile, DEFAULT_PORT};
pub use settings::{expand_env_vars, IngestSettings, ServiceSettings, Settings, SettingsError};
