//! Workflow state machine.
//!
//! [`Workflow`] is the only thing that mutates a workflow's state and
//! selections. Synchronous events (selecting columns, editing the join
//! condition, reset) apply immediately. Remote operations are split into
//! `begin_*` (validate, transition, hand out a [`Pending`]) and `finish_*`
//! (fold a [`Settled`] back in), with an async convenience method that does
//! both for callers that hold the workflow across the await.

use tracing::{debug, info, warn};

use super::error::{messages, WorkflowError, WorkflowResult};
use super::guard::SingleFlight;
use super::join;
use super::pending::{
    ColumnFetch, ConnectCall, Epoch, Outcome, Pending, ServiceCall, Settled, TableListing,
};
use super::selection::SelectionStore;
use super::state::{Failure, Operation, WorkflowState};
use crate::config::IngestSettings;
use crate::source::{OutputTarget, Source, UploadedFile};
use crate::transport::{IngestRequest, IngestService, PreviewRequest, TransportResult};

/// One operator's connect → select → preview → ingest cycle.
#[derive(Debug)]
pub struct Workflow {
    state: WorkflowState,
    store: SelectionStore,
    guard: SingleFlight,
    epoch: Epoch,
    failure: Option<Failure>,
    output_delimiter: String,
    /// State an in-flight ingest falls back to on failure.
    resume_state: WorkflowState,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::with_settings(&IngestSettings::default())
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &IngestSettings) -> Self {
        Self {
            state: WorkflowState::Disconnected,
            store: SelectionStore::new(),
            guard: SingleFlight::new(),
            epoch: Epoch::default(),
            failure: None,
            output_delimiter: settings.output_delimiter.clone(),
            resume_state: WorkflowState::Disconnected,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// The most recent error, if the last transition failed.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.store
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether a preview or ingest is in flight.
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Records written by the last committed ingestion.
    pub fn record_count(&self) -> Option<u64> {
        self.store.ingestion().map(|r| r.record_count)
    }

    /// Status line for the current state.
    pub fn status(&self) -> Option<String> {
        match self.state {
            WorkflowState::Previewing => Some("Fetching preview...".to_string()),
            WorkflowState::PreviewReady => {
                let count = self.store.preview().map_or(0, |p| p.count);
                Some(format!("Preview: {} records", count))
            }
            WorkflowState::Ingesting => Some("Ingesting...".to_string()),
            WorkflowState::Completed => Some("Ingestion complete".to_string()),
            _ => None,
        }
    }

    // =========================================================================
    // Synchronous events
    // =========================================================================

    /// Replace the source without contacting the service.
    ///
    /// Discards every selection and result. A flat-file source chosen this
    /// way has no upload until [`connect`](Self::connect) succeeds.
    pub fn select_source(&mut self, source: Option<Source>) {
        self.advance();
        self.state = self.store.set_source(source);
        self.failure = None;
    }

    /// Replace the column selection.
    ///
    /// An empty selection steps back to `TablesSelected` (warehouse) or
    /// `Connected` (flat file). Rejected while a preview or ingest is in
    /// flight.
    pub fn select_columns(&mut self, columns: Vec<String>) -> WorkflowResult<()> {
        let result = self
            .require_idle()
            .and_then(|_| self.check_columns(&columns));
        self.record(result)?;

        let back = if self.store.source().is_some_and(Source::is_relational) {
            WorkflowState::TablesSelected
        } else {
            WorkflowState::Connected
        };
        let empty = columns.is_empty();
        self.store.set_columns(columns);
        self.advance();
        self.failure = None;
        self.state = if empty {
            back
        } else {
            WorkflowState::ColumnsReady
        };
        debug!(columns = self.store.columns().len(), "columns selected");
        Ok(())
    }

    fn check_columns(&self, columns: &[String]) -> WorkflowResult<()> {
        match self.store.source() {
            None => return Err(WorkflowError::validation(messages::NO_SOURCE)),
            Some(Source::Relational(_)) if self.store.tables().is_empty() => {
                return Err(WorkflowError::validation(messages::NO_TABLE))
            }
            Some(Source::FlatFile(_)) if self.store.upload().is_none() => {
                return Err(WorkflowError::validation(messages::NO_FILE))
            }
            Some(_) => {}
        }
        if let Some(column) = self.store.unknown_column(columns) {
            return Err(WorkflowError::validation(format!(
                "Unknown column: {}",
                column
            )));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(WorkflowError::validation(format!(
                    "Duplicate column: {}",
                    column
                )));
            }
        }
        Ok(())
    }

    /// Store the join condition. Checked at preview/ingest time.
    pub fn set_join_condition(&mut self, condition: impl Into<String>) {
        self.store.set_join_condition(condition);
    }

    /// Store the output file path or table name. Checked at ingest time.
    pub fn set_output_target(&mut self, target: impl Into<String>) {
        self.store.set_output_target(target);
    }

    /// Discard everything and return to `Disconnected`.
    ///
    /// Results of requests still in flight are discarded when they settle.
    pub fn reset(&mut self) {
        self.advance();
        self.store.clear();
        self.state = WorkflowState::Disconnected;
        self.failure = None;
        info!(epoch = %self.epoch, "workflow reset");
    }

    // =========================================================================
    // Connect
    // =========================================================================

    /// Validate `source`, drop the current one and issue a connect.
    ///
    /// # Errors
    ///
    /// `Validation` if the source is incomplete. Nothing is sent and the
    /// current source is kept.
    pub fn begin_connect(&mut self, source: Source) -> WorkflowResult<Pending<ConnectCall>> {
        let checked = source
            .validate()
            .map_err(|e| WorkflowError::validation(e.to_string()));
        self.record(checked)?;

        self.advance();
        self.store.clear();
        self.state = WorkflowState::Disconnected;
        self.failure = None;
        Ok(Pending::new(self.epoch, ConnectCall { source }, None))
    }

    pub fn finish_connect(&mut self, settled: Settled<ConnectCall>) -> WorkflowResult<Outcome> {
        let Some(Settled {
            request, result, ..
        }) = self.accept(settled)
        else {
            return Ok(Outcome::Discarded);
        };

        let columns = self.fold(Operation::Connect, result)?;
        let source = request.source;
        match &source {
            Source::Relational(r) => info!(
                source = source.label(),
                address = %r.address(),
                tls = r.is_secure(),
                "connected"
            ),
            Source::FlatFile(f) => {
                info!(source = source.label(), path = %f.path.display(), "connected")
            }
        }

        let upload = match &source {
            Source::FlatFile(f) => Some(UploadedFile::from_source(f)),
            Source::Relational(_) => None,
        };
        self.state = self.store.set_source(Some(source));
        if let Some(upload) = upload {
            self.store.set_upload(upload, columns.unwrap_or_default());
        }
        Ok(Outcome::Applied)
    }

    pub async fn connect(
        &mut self,
        service: &dyn IngestService,
        source: Source,
    ) -> WorkflowResult<Outcome> {
        let pending = self.begin_connect(source)?;
        let settled = pending.run(service).await;
        self.finish_connect(settled)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Issue a table listing for the connected warehouse.
    pub fn begin_load_tables(&mut self) -> WorkflowResult<Pending<TableListing>> {
        let result = self.require_warehouse();
        self.record(result)?;
        Ok(Pending::new(self.epoch, TableListing, None))
    }

    pub fn finish_tables(&mut self, settled: Settled<TableListing>) -> WorkflowResult<Outcome> {
        let Some(Settled { result, .. }) = self.accept(settled) else {
            return Ok(Outcome::Discarded);
        };

        let tables = self.fold(Operation::ListTables, result)?;
        debug!(count = tables.len(), "tables listed");
        self.store.set_available_tables(tables);
        Ok(Outcome::Applied)
    }

    pub async fn load_tables(&mut self, service: &dyn IngestService) -> WorkflowResult<Outcome> {
        let pending = self.begin_load_tables()?;
        let settled = pending.run(service).await;
        self.finish_tables(settled)
    }

    /// Select up to two warehouse tables and issue the column fetch.
    ///
    /// The workflow is `TablesSelected` on return; the column universe stays
    /// empty until [`finish_columns`](Self::finish_columns) applies. Rejected
    /// while a preview or ingest is in flight.
    pub fn begin_select_tables(
        &mut self,
        tables: Vec<String>,
    ) -> WorkflowResult<Pending<ColumnFetch>> {
        let result = self
            .require_idle()
            .and_then(|_| self.require_warehouse())
            .and_then(|_| self.store.set_tables(tables));
        self.record(result)?;

        self.advance();
        self.state = WorkflowState::TablesSelected;
        self.failure = None;
        debug!(tables = ?self.store.tables(), "tables selected");
        Ok(Pending::new(
            self.epoch,
            ColumnFetch {
                tables: self.store.tables().to_vec(),
            },
            None,
        ))
    }

    pub fn finish_columns(&mut self, settled: Settled<ColumnFetch>) -> WorkflowResult<Outcome> {
        let Some(Settled { result, .. }) = self.accept(settled) else {
            return Ok(Outcome::Discarded);
        };

        let columns = self.fold(Operation::ListColumns, result)?;
        debug!(count = columns.len(), "column universe fetched");
        self.store.set_column_universe(columns);
        Ok(Outcome::Applied)
    }

    pub async fn select_tables(
        &mut self,
        service: &dyn IngestService,
        tables: Vec<String>,
    ) -> WorkflowResult<Outcome> {
        let pending = self.begin_select_tables(tables)?;
        let settled = pending.run(service).await;
        self.finish_columns(settled)
    }

    fn require_warehouse(&self) -> WorkflowResult<()> {
        match self.store.source() {
            Some(Source::Relational(_)) => Ok(()),
            Some(Source::FlatFile(_)) => {
                Err(WorkflowError::validation(messages::TABLES_NEED_WAREHOUSE))
            }
            None => Err(WorkflowError::validation(messages::NO_SOURCE)),
        }
    }

    // =========================================================================
    // Preview
    // =========================================================================

    /// Validate the selection and issue a preview.
    ///
    /// Returns `Ok(None)` without validating anything when another preview
    /// or ingest is in flight.
    pub fn begin_preview(&mut self) -> WorkflowResult<Option<Pending<PreviewRequest>>> {
        let Some(permit) = self.guard.try_acquire() else {
            debug!("preview ignored, request in flight");
            return Ok(None);
        };

        let request = self
            .preview_request()
            .and_then(|request| self.admit("Preview").map(|_| request));
        let request = self.record(request)?;

        self.resume_state = self.settled_state();
        self.state = WorkflowState::Previewing;
        self.failure = None;
        Ok(Some(Pending::new(self.epoch, request, Some(permit))))
    }

    pub fn finish_preview(
        &mut self,
        settled: Settled<PreviewRequest>,
    ) -> WorkflowResult<Outcome> {
        let Some(Settled { result, .. }) = self.accept(settled) else {
            return Ok(Outcome::Discarded);
        };

        match self.fold(Operation::Preview, result) {
            Ok(preview) => {
                info!(count = preview.count, "preview ready");
                self.store.record_preview(preview);
                self.state = WorkflowState::PreviewReady;
                Ok(Outcome::Applied)
            }
            Err(e) => {
                self.store.clear_preview();
                self.state = WorkflowState::ColumnsReady;
                Err(e)
            }
        }
    }

    pub async fn preview(&mut self, service: &dyn IngestService) -> WorkflowResult<Outcome> {
        let Some(pending) = self.begin_preview()? else {
            return Ok(Outcome::Busy);
        };
        let settled = pending.run(service).await;
        self.finish_preview(settled)
    }

    fn preview_request(&self) -> WorkflowResult<PreviewRequest> {
        match self.store.source() {
            None => Err(WorkflowError::validation(messages::NO_SOURCE)),
            Some(Source::Relational(_)) => {
                self.require_relational_selection()?;
                let join_condition = self.checked_join()?;
                Ok(PreviewRequest::Relational {
                    tables: self.store.tables().to_vec(),
                    columns: self.store.columns().to_vec(),
                    join_condition,
                })
            }
            Some(Source::FlatFile(_)) => {
                let file = self.require_upload()?;
                Ok(PreviewRequest::FlatFile {
                    file,
                    columns: self.store.columns().to_vec(),
                })
            }
        }
    }

    // =========================================================================
    // Ingest
    // =========================================================================

    /// Validate the selection and output target and issue an ingestion.
    ///
    /// Returns `Ok(None)` without validating anything when another preview
    /// or ingest is in flight.
    pub fn begin_ingest(&mut self) -> WorkflowResult<Option<Pending<IngestRequest>>> {
        let Some(permit) = self.guard.try_acquire() else {
            debug!("ingest ignored, request in flight");
            return Ok(None);
        };

        let request = self
            .ingest_request()
            .and_then(|request| self.admit("Ingestion").map(|_| request));
        let request = self.record(request)?;

        self.resume_state = self.settled_state();
        self.state = WorkflowState::Ingesting;
        self.failure = None;
        Ok(Some(Pending::new(self.epoch, request, Some(permit))))
    }

    pub fn finish_ingest(&mut self, settled: Settled<IngestRequest>) -> WorkflowResult<Outcome> {
        let Some(Settled { result, .. }) = self.accept(settled) else {
            return Ok(Outcome::Discarded);
        };

        match self.fold(Operation::Ingest, result) {
            Ok(ingestion) => {
                info!(records = ingestion.record_count, "ingestion complete");
                self.store.record_ingestion(ingestion);
                self.state = WorkflowState::Completed;
                Ok(Outcome::Applied)
            }
            Err(e) => {
                self.state = self.resume_state;
                Err(e)
            }
        }
    }

    pub async fn ingest(&mut self, service: &dyn IngestService) -> WorkflowResult<Outcome> {
        let Some(pending) = self.begin_ingest()? else {
            return Ok(Outcome::Busy);
        };
        let settled = pending.run(service).await;
        self.finish_ingest(settled)
    }

    fn ingest_request(&self) -> WorkflowResult<IngestRequest> {
        let Some(source) = self.store.source() else {
            return Err(WorkflowError::validation(messages::NO_SOURCE));
        };
        match source {
            Source::Relational(_) => {
                self.require_relational_selection()?;
                let Some(OutputTarget::File(output_path)) =
                    OutputTarget::for_direction(source.direction(), self.store.output_target())
                else {
                    return Err(WorkflowError::validation(messages::NO_OUTPUT_FILE));
                };
                let join_condition = self.checked_join()?;
                Ok(IngestRequest::ToFile {
                    tables: self.store.tables().to_vec(),
                    columns: self.store.columns().to_vec(),
                    join_condition,
                    output_path,
                    delimiter: self.output_delimiter.clone(),
                })
            }
            Source::FlatFile(_) => {
                let file = self.require_upload()?;
                let Some(OutputTarget::Table(table)) =
                    OutputTarget::for_direction(source.direction(), self.store.output_target())
                else {
                    return Err(WorkflowError::validation(messages::NO_OUTPUT_TABLE));
                };
                Ok(IngestRequest::ToTable {
                    file,
                    columns: self.store.columns().to_vec(),
                    table,
                })
            }
        }
    }

    // =========================================================================
    // Shared checks
    // =========================================================================

    /// Selections are fixed while a preview or ingest is in flight.
    fn require_idle(&self) -> WorkflowResult<()> {
        if self.state.is_busy() && self.guard.is_busy() {
            return Err(WorkflowError::validation(messages::SELECTION_LOCKED));
        }
        Ok(())
    }

    fn require_relational_selection(&self) -> WorkflowResult<()> {
        if self.store.tables().is_empty() {
            return Err(WorkflowError::validation(messages::NO_TABLE));
        }
        if self.store.columns().is_empty() {
            return Err(WorkflowError::validation(messages::NO_COLUMNS));
        }
        Ok(())
    }

    fn require_upload(&self) -> WorkflowResult<UploadedFile> {
        let Some(file) = self.store.upload() else {
            return Err(WorkflowError::validation(messages::NO_FILE));
        };
        if self.store.columns().is_empty() {
            return Err(WorkflowError::validation(messages::NO_COLUMNS));
        }
        Ok(file.clone())
    }

    /// The join condition to send, `None` for a single table.
    fn checked_join(&self) -> WorkflowResult<Option<String>> {
        let tables = self.store.tables();
        if tables.len() < 2 {
            return Ok(None);
        }
        let condition = self.store.join_condition();
        if condition.is_empty() {
            return Err(WorkflowError::validation(messages::JOIN_REQUIRED));
        }
        let Some(keys) = join::parse_join_condition(condition, tables) else {
            return Err(WorkflowError::validation(messages::JOIN_INVALID));
        };
        debug!(left = %keys.left, right = %keys.right, "join keys");
        Ok(Some(condition.to_string()))
    }

    fn admit(&self, what: &str) -> WorkflowResult<()> {
        let state = self.settled_state();
        if state.accepts_request() {
            Ok(())
        } else {
            Err(WorkflowError::validation(format!(
                "{} is not available while {}",
                what, state
            )))
        }
    }

    /// The live state, looking through a busy state whose request was
    /// dropped without being finished.
    ///
    /// Only called with the permit held, so no other request is in flight.
    fn settled_state(&self) -> WorkflowState {
        if self.state.is_busy() {
            self.resume_state
        } else {
            self.state
        }
    }

    // =========================================================================
    // Bookkeeping
    // =========================================================================

    fn advance(&mut self) {
        self.epoch = self.epoch.next();
    }

    /// Record a local validation failure as the current annotation.
    fn record<T>(&mut self, result: WorkflowResult<T>) -> WorkflowResult<T> {
        if let Err(e) = &result {
            debug!(error = %e, "rejected");
            self.failure = Some(e.to_failure());
        }
        result
    }

    /// Release the guard and keep the result only if it is still current.
    fn accept<R: ServiceCall>(&self, mut settled: Settled<R>) -> Option<Settled<R>> {
        settled.release();
        if settled.epoch != self.epoch {
            debug!(
                request_id = %settled.id,
                issued = %settled.epoch,
                current = %self.epoch,
                operation = ?R::OPERATION,
                "discarding stale result"
            );
            return None;
        }
        Some(settled)
    }

    /// Classify a transport failure and record it, or clear the annotation.
    fn fold<T>(&mut self, operation: Operation, result: TransportResult<T>) -> WorkflowResult<T> {
        match result {
            Ok(value) => {
                self.failure = None;
                Ok(value)
            }
            Err(e) => {
                let err = WorkflowError::from_transport(operation, &e);
                warn!(?operation, error = %e, "request failed");
                self.failure = Some(err.to_failure());
                Err(err)
            }
        }
    }
}
