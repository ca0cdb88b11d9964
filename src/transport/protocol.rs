//! Request and response types exchanged with the ingestion service.
//!
//! The request enums are what the workflow hands to an [`IngestService`];
//! the `*Body` types mirror the service's JSON bodies and stay private to
//! the HTTP implementation.
//!
//! [`IngestService`]: super::IngestService

use serde::{Deserialize, Serialize};

use crate::source::UploadedFile;

/// One preview row: column name → value.
pub type Row = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Requests
// ============================================================================

/// A bounded sample request.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewRequest {
    /// Sample rows from one table, or from two tables joined on a condition.
    Relational {
        tables: Vec<String>,
        columns: Vec<String>,
        /// Present iff `tables.len() > 1`.
        join_condition: Option<String>,
    },
    /// Sample rows from the uploaded file.
    FlatFile {
        file: UploadedFile,
        columns: Vec<String>,
    },
}

impl PreviewRequest {
    pub fn columns(&self) -> &[String] {
        match self {
            PreviewRequest::Relational { columns, .. }
            | PreviewRequest::FlatFile { columns, .. } => columns,
        }
    }
}

/// A full ingestion request.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestRequest {
    /// Export one table, or a two-table join, into a delimited file.
    ToFile {
        tables: Vec<String>,
        columns: Vec<String>,
        /// Present iff `tables.len() > 1`.
        join_condition: Option<String>,
        output_path: String,
        delimiter: String,
    },
    /// Load the uploaded file into a warehouse table.
    ToTable {
        file: UploadedFile,
        columns: Vec<String>,
        table: String,
    },
}

impl IngestRequest {
    pub fn columns(&self) -> &[String] {
        match self {
            IngestRequest::ToFile { columns, .. } | IngestRequest::ToTable { columns, .. } => {
                columns
            }
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Acknowledgement of a warehouse connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ConnectAck {
    #[serde(default)]
    pub message: String,
}

/// A bounded sample of the selected rowset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreviewResult {
    /// Rows in the order the service returned them.
    #[serde(rename = "data", default)]
    pub rows: Vec<Row>,
    /// Number of records in the sample.
    pub count: u64,
}

impl PreviewResult {
    pub fn new(rows: Vec<Row>) -> Self {
        let count = rows.len() as u64;
        Self { rows, count }
    }
}

/// Outcome of a committed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub record_count: u64,
}

// ============================================================================
// Service bodies
// ============================================================================

/// Response from `POST /connect/flatfile`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FlatFileConnectBody {
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Response from `GET /tables`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TablesBody {
    pub tables: Vec<String>,
}

/// Response from `GET /columns/{table}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ColumnsBody {
    pub columns: Vec<String>,
}

/// Failure body. `detail` is usually a string but validation failures
/// carry a list of objects.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Parse a failure body and pull out a readable detail.
    pub fn detail_from(bytes: &[u8]) -> Option<String> {
        let body: ErrorBody = serde_json::from_slice(bytes).ok()?;
        match body.detail? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
