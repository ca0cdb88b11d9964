//! Data sources and ingestion targets.
//!
//! A workflow moves data in one of two directions, fixed by the active
//! [`Source`]:
//!
//! ```text
//!   Source::Relational ──▶ OutputTarget::File   (warehouse → flat file)
//!   Source::FlatFile   ──▶ OutputTarget::Table  (flat file → warehouse)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Ports on which the warehouse only accepts TLS connections.
const SECURE_PORTS: [u16; 2] = [8443, 9440];

/// Error type for source validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Delimiter must be a single character, got {0:?}")]
    InvalidDelimiter(String),
}

/// Connection parameters for the relational warehouse.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalSource {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// User name.
    pub user: String,
    /// Access token or password.
    pub credential: String,
}

// Hand-written so the credential never ends up in logs.
impl fmt::Debug for RelationalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalSource")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl RelationalSource {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            credential: credential.into(),
        }
    }

    /// Whether the port implies a TLS endpoint.
    pub fn is_secure(&self) -> bool {
        SECURE_PORTS.contains(&self.port)
    }

    /// `host:port/database`, for display and logging.
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }

    fn validate(&self) -> Result<(), SourceError> {
        if self.host.trim().is_empty() {
            return Err(SourceError::MissingField("host"));
        }
        if self.port == 0 {
            return Err(SourceError::InvalidPort(self.port));
        }
        if self.database.trim().is_empty() {
            return Err(SourceError::MissingField("database"));
        }
        if self.user.trim().is_empty() {
            return Err(SourceError::MissingField("user"));
        }
        Ok(())
    }
}

/// A delimited flat file on the operator's machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFileSource {
    /// Path of the file to upload.
    pub path: PathBuf,
    /// Field delimiter.
    pub delimiter: String,
}

impl FlatFileSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            delimiter: delimiter.into(),
        }
    }

    fn validate(&self) -> Result<(), SourceError> {
        if self.path.as_os_str().is_empty() {
            return Err(SourceError::MissingField("path"));
        }
        if self.delimiter.chars().count() != 1 {
            return Err(SourceError::InvalidDelimiter(self.delimiter.clone()));
        }
        Ok(())
    }
}

/// The active origin of data for a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    /// The relational warehouse.
    Relational(RelationalSource),
    /// An uploaded delimited file.
    FlatFile(FlatFileSource),
}

impl Source {
    /// Check the fields a connect request needs.
    pub fn validate(&self) -> Result<(), SourceError> {
        match self {
            Source::Relational(r) => r.validate(),
            Source::FlatFile(f) => f.validate(),
        }
    }

    /// The direction an ingestion from this source runs in.
    pub fn direction(&self) -> Direction {
        match self {
            Source::Relational(_) => Direction::WarehouseToFile,
            Source::FlatFile(_) => Direction::FileToWarehouse,
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, Source::Relational(_))
    }

    /// Short label used in status output and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Source::Relational(_) => "warehouse",
            Source::FlatFile(_) => "flat file",
        }
    }
}

/// Which way data flows during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    WarehouseToFile,
    FileToWarehouse,
}

/// A flat file the service has accepted and parsed.
///
/// Only exists after a successful flat-file connect; preview and ingest
/// re-send the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub delimiter: String,
}

impl UploadedFile {
    pub fn from_source(source: &FlatFileSource) -> Self {
        Self {
            path: source.path.clone(),
            delimiter: source.delimiter.clone(),
        }
    }

    /// File name sent with multipart uploads.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.csv".to_string())
}

/// Where a committed ingestion writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Destination file path (warehouse → file).
    File(String),
    /// Destination table name (file → warehouse).
    Table(String),
}

impl OutputTarget {
    /// Interpret the operator's raw output field for the given direction.
    ///
    /// Returns `None` when the field is blank.
    pub fn for_direction(direction: Direction, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match direction {
            Direction::WarehouseToFile => OutputTarget::File(raw.to_string()),
            Direction::FileToWarehouse => OutputTarget::Table(raw.to_string()),
        })
    }
}
