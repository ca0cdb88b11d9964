//! Selection store.
//!
//! Holds the operator's selections and the data derived from them. Every
//! setter replaces or clears whole fields; a change upstream clears what
//! depends on it instead of trying to reconcile:
//!
//! ```text
//! source ──▶ upload / available tables ──▶ tables ──▶ column universe
//!                                                        │
//!                                 join condition ◀───────┤
//!                                                        ▼
//!                                                     columns ──▶ preview / ingestion result
//! ```

use super::error::{messages, WorkflowError, WorkflowResult};
use super::state::WorkflowState;
use crate::source::{Source, UploadedFile};
use crate::transport::{IngestionResult, PreviewResult};

/// Maximum number of tables in one selection.
pub const MAX_TABLES: usize = 2;

/// Current selections of one workflow instance.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    source: Option<Source>,
    upload: Option<UploadedFile>,
    available_tables: Vec<String>,
    tables: Vec<String>,
    column_universe: Vec<String>,
    columns: Vec<String>,
    join_condition: String,
    output_target: String,
    preview: Option<PreviewResult>,
    ingestion: Option<IngestionResult>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Replace the source and discard everything that depended on the old one.
    ///
    /// Returns the state the workflow is in afterwards.
    pub fn set_source(&mut self, source: Option<Source>) -> WorkflowState {
        *self = Self {
            source,
            ..Self::default()
        };
        if self.source.is_some() {
            WorkflowState::Connected
        } else {
            WorkflowState::Disconnected
        }
    }

    /// Record the file the service accepted, with its columns.
    pub fn set_upload(&mut self, upload: UploadedFile, columns: Vec<String>) {
        self.upload = Some(upload);
        self.set_column_universe(columns);
    }

    pub fn set_available_tables(&mut self, tables: Vec<String>) {
        self.available_tables = tables;
    }

    /// Replace the table selection.
    ///
    /// Clears the column universe, column selection, join condition and any
    /// result bound to the old tables.
    ///
    /// # Errors
    ///
    /// `Validation` if the selection is empty, has more than two tables,
    /// repeats a table, or names a table outside the listed ones (when a
    /// listing has been loaded). The store is unchanged on error.
    pub fn set_tables(&mut self, tables: Vec<String>) -> WorkflowResult<()> {
        if tables.is_empty() {
            return Err(WorkflowError::validation(messages::NO_TABLE));
        }
        if tables.len() > MAX_TABLES {
            return Err(WorkflowError::validation(messages::TOO_MANY_TABLES));
        }
        for (i, table) in tables.iter().enumerate() {
            if table.trim().is_empty() {
                return Err(WorkflowError::validation(messages::NO_TABLE));
            }
            if tables[..i].contains(table) {
                return Err(WorkflowError::validation(format!("Duplicate table: {}", table)));
            }
            if !self.available_tables.is_empty() && !self.available_tables.contains(table) {
                return Err(WorkflowError::validation(format!("Unknown table: {}", table)));
            }
        }

        self.tables = tables;
        self.column_universe.clear();
        self.columns.clear();
        self.join_condition.clear();
        self.preview = None;
        self.ingestion = None;
        Ok(())
    }

    /// Replace the set of selectable columns. Clears the column selection.
    pub fn set_column_universe(&mut self, columns: Vec<String>) {
        self.column_universe = columns;
        self.columns.clear();
        self.preview = None;
    }

    /// Replace the column selection.
    ///
    /// Callers only pass columns from [`column_universe`](Self::column_universe);
    /// see [`unknown_column`](Self::unknown_column). The join condition and
    /// output target are kept.
    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
        self.preview = None;
        self.ingestion = None;
    }

    pub fn set_join_condition(&mut self, condition: impl Into<String>) {
        self.join_condition = condition.into();
    }

    pub fn set_output_target(&mut self, target: impl Into<String>) {
        self.output_target = target.into();
    }

    pub fn record_preview(&mut self, preview: PreviewResult) {
        self.preview = Some(preview);
    }

    pub fn clear_preview(&mut self) {
        self.preview = None;
    }

    /// Record a committed ingestion and clear the inputs it consumed.
    pub fn record_ingestion(&mut self, result: IngestionResult) {
        self.ingestion = Some(result);
        self.preview = None;
        self.output_target.clear();
        self.join_condition.clear();
    }

    /// Discard everything, including the source.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn upload(&self) -> Option<&UploadedFile> {
        self.upload.as_ref()
    }

    pub fn available_tables(&self) -> &[String] {
        &self.available_tables
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn column_universe(&self) -> &[String] {
        &self.column_universe
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn join_condition(&self) -> &str {
        &self.join_condition
    }

    pub fn output_target(&self) -> &str {
        &self.output_target
    }

    pub fn preview(&self) -> Option<&PreviewResult> {
        self.preview.as_ref()
    }

    pub fn ingestion(&self) -> Option<&IngestionResult> {
        self.ingestion.as_ref()
    }

    /// First column not in the current universe, if any.
    pub fn unknown_column<'a>(&self, columns: &'a [String]) -> Option<&'a str> {
        columns
            .iter()
            .find(|c| !self.column_universe.contains(c))
            .map(String::as_str)
    }

    /// Whether nothing is selected and no results are held.
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.upload.is_none()
            && self.available_tables.is_empty()
            && self.tables.is_empty()
            && self.column_universe.is_empty()
            && self.columns.is_empty()
            && self.join_condition.is_empty()
            && self.output_target.is_empty()
            && self.preview.is_none()
            && self.ingestion.is_none()
    }
}
