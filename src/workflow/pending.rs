//! In-flight requests and their results.
//!
//! Every remote call goes through three steps so that a result can be
//! checked against the workflow it was issued for:
//!
//! ```text
//!  Workflow::begin_*() ──▶ Pending<R> ──run(service).await──▶ Settled<R> ──▶ finish_*()
//!        │                 epoch                                epoch            │
//!        └── captures epoch ─────────────────────────────────────────── compared ┘
//! ```
//!
//! The workflow advances its epoch whenever a selection is abandoned, so a
//! `Settled` carrying an older epoch is discarded without touching state.

use std::fmt;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::guard::FlightPermit;
use super::state::Operation;
use crate::source::{Source, UploadedFile};
use crate::transport::{
    IngestRequest, IngestService, IngestionResult, PreviewRequest, PreviewResult, TransportResult,
};

/// Generation counter of a workflow's selections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    pub(crate) fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A service call the workflow can issue.
#[async_trait]
pub trait ServiceCall: Send + Sync {
    type Output: Send;

    const OPERATION: Operation;

    async fn call(&self, service: &dyn IngestService) -> TransportResult<Self::Output>;
}

/// Connect to a source. Flat files come back with their column names.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectCall {
    pub source: Source,
}

#[async_trait]
impl ServiceCall for ConnectCall {
    type Output = Option<Vec<String>>;

    const OPERATION: Operation = Operation::Connect;

    async fn call(&self, service: &dyn IngestService) -> TransportResult<Self::Output> {
        match &self.source {
            Source::Relational(r) => service.connect_relational(r).await.map(|_| None),
            Source::FlatFile(f) => service
                .connect_flat_file(&UploadedFile::from_source(f))
                .await
                .map(Some),
        }
    }
}

/// List the warehouse tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableListing;

#[async_trait]
impl ServiceCall for TableListing {
    type Output = Vec<String>;

    const OPERATION: Operation = Operation::ListTables;

    async fn call(&self, service: &dyn IngestService) -> TransportResult<Self::Output> {
        service.list_tables().await
    }
}

/// Fetch the column universe of a table selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFetch {
    pub tables: Vec<String>,
}

#[async_trait]
impl ServiceCall for ColumnFetch {
    type Output = Vec<String>;

    const OPERATION: Operation = Operation::ListColumns;

    async fn call(&self, service: &dyn IngestService) -> TransportResult<Self::Output> {
        service.list_qualified_columns(&self.tables).await
    }
}

#[async_trait]
impl ServiceCall for PreviewRequest {
    type Output = PreviewResult;

    const OPERATION: Operation = Operation::Preview;

    async fn call(&self, service: &dyn IngestService) -> TransportResult<Self::Output> {
        service.preview(self).await
    }
}

#[async_trait]
impl ServiceCall for IngestRequest {
    type Output = IngestionResult;

    const OPERATION: Operation = Operation::Ingest;

    async fn call(&self, service: &dyn IngestService) -> TransportResult<Self::Output> {
        service.ingest(self).await
    }
}

/// A request issued by the workflow but not yet sent.
///
/// Holds the single-flight permit for preview and ingest; the guard stays
/// busy until the matching [`Settled`] is handed back or dropped.
#[must_use = "a pending request does nothing until run"]
#[derive(Debug)]
pub struct Pending<R> {
    pub(crate) id: Uuid,
    pub(crate) epoch: Epoch,
    pub(crate) request: R,
    pub(crate) permit: Option<FlightPermit>,
}

impl<R: ServiceCall> Pending<R> {
    pub(crate) fn new(epoch: Epoch, request: R, permit: Option<FlightPermit>) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            request,
            permit,
        }
    }

    /// Correlation id for logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn request(&self) -> &R {
        &self.request
    }

    /// Send the request and wait for the service.
    pub async fn run(self, service: &dyn IngestService) -> Settled<R> {
        debug!(
            request_id = %self.id,
            epoch = %self.epoch,
            operation = ?R::OPERATION,
            "request issued"
        );
        let result = self.request.call(service).await;
        debug!(
            request_id = %self.id,
            epoch = %self.epoch,
            ok = result.is_ok(),
            "request settled"
        );

        Settled {
            id: self.id,
            epoch: self.epoch,
            request: self.request,
            result,
            permit: self.permit,
        }
    }
}

/// A request together with the service's answer.
pub struct Settled<R: ServiceCall> {
    pub(crate) id: Uuid,
    pub(crate) epoch: Epoch,
    pub(crate) request: R,
    pub(crate) result: TransportResult<R::Output>,
    pub(crate) permit: Option<FlightPermit>,
}

impl<R: ServiceCall> Settled<R> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Drop the permit, releasing the guard.
    pub(crate) fn release(&mut self) {
        self.permit.take();
    }
}

impl<R: ServiceCall + fmt::Debug> fmt::Debug for Settled<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settled")
            .field("id", &self.id)
            .field("epoch", &self.epoch)
            .field("request", &self.request)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// What became of an operation's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was folded into the workflow.
    Applied,
    /// The workflow moved on; the result was dropped.
    Discarded,
    /// Another operation was in flight; nothing was issued.
    Busy,
}
