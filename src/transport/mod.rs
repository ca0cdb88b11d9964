//! Transport adapter for the remote ingestion service.
//!
//! The workflow never talks to the warehouse or the filesystem directly.
//! Connection handling, SQL execution, CSV parsing and file writes all live
//! behind the ingestion service; this module is the request/response
//! contract the workflow consumes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       IngestService (trait)                     │
//! │  - connect_relational()     - preview()                         │
//! │  - connect_flat_file()      - ingest()                          │
//! │  - list_tables()            - list_qualified_columns()          │
//! │  - list_columns()             (default, fans out per table)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      HttpIngestService                          │
//! │           (form / multipart requests, JSON responses)           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ingest_bridge::transport::{HttpIngestService, IngestService};
//!
//! let service = HttpIngestService::new(&settings.service)?;
//! let tables = service.list_tables().await?;
//! let columns = service.list_qualified_columns(&tables[..1]).await?;
//! ```

mod error;
mod http;
pub mod protocol;

use async_trait::async_trait;

pub use error::{TransportError, TransportResult};
pub use http::HttpIngestService;
pub use protocol::{
    ConnectAck, IngestRequest, IngestionResult, PreviewRequest, PreviewResult, Row,
};

use crate::source::{RelationalSource, UploadedFile};

/// Request/response contract of the ingestion service.
///
/// Every call is one-shot and stateless from the caller's side: nothing is
/// carried between calls beyond what the arguments encode. Timeouts are the
/// implementation's concern and surface as [`TransportError::Timeout`].
#[async_trait]
pub trait IngestService: Send + Sync {
    /// Open a warehouse connection.
    async fn connect_relational(&self, source: &RelationalSource) -> TransportResult<ConnectAck>;

    /// Upload a flat file and return its column names.
    async fn connect_flat_file(&self, file: &UploadedFile) -> TransportResult<Vec<String>>;

    /// List the tables of the connected database.
    async fn list_tables(&self) -> TransportResult<Vec<String>>;

    /// List the columns of one table, unqualified.
    async fn list_columns(&self, table: &str) -> TransportResult<Vec<String>>;

    /// Fetch a bounded sample.
    async fn preview(&self, request: &PreviewRequest) -> TransportResult<PreviewResult>;

    /// Run a full ingestion.
    async fn ingest(&self, request: &IngestRequest) -> TransportResult<IngestionResult>;

    /// Columns of every table as `table.column`, in table order.
    ///
    /// Default implementation fetches the tables concurrently and fails if
    /// any single fetch fails.
    async fn list_qualified_columns(&self, tables: &[String]) -> TransportResult<Vec<String>> {
        let futures: Vec<_> = tables.iter().map(|t| self.list_columns(t)).collect();
        let results = futures::future::join_all(futures).await;

        let mut qualified = Vec::new();
        for (table, result) in tables.iter().zip(results) {
            qualified.extend(result?.into_iter().map(|c| format!("{}.{}", table, c)));
        }
        Ok(qualified)
    }
}
