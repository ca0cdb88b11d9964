//! Workflow states and error classification.

use std::fmt;

/// The live step of a workflow.
///
/// Exactly one state is live at a time and it alone decides which events
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// No source.
    Disconnected,
    /// A source is active; nothing selected yet.
    Connected,
    /// Warehouse tables chosen; column universe fetched or being fetched.
    TablesSelected,
    /// A non-empty column selection exists.
    ColumnsReady,
    /// A preview request is in flight.
    Previewing,
    /// A preview sample is available.
    PreviewReady,
    /// An ingestion request is in flight.
    Ingesting,
    /// The ingestion committed.
    Completed,
}

impl WorkflowState {
    /// Whether a guarded request is in flight in this state.
    pub fn is_busy(self) -> bool {
        matches!(self, WorkflowState::Previewing | WorkflowState::Ingesting)
    }

    /// States Preview and Ingest may be issued from.
    pub fn accepts_request(self) -> bool {
        matches!(self, WorkflowState::ColumnsReady | WorkflowState::PreviewReady)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Disconnected => "disconnected",
            WorkflowState::Connected => "connected",
            WorkflowState::TablesSelected => "tables selected",
            WorkflowState::ColumnsReady => "columns ready",
            WorkflowState::Previewing => "previewing",
            WorkflowState::PreviewReady => "preview ready",
            WorkflowState::Ingesting => "ingesting",
            WorkflowState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connect call failed.
    Connection,
    /// Listing tables or columns failed.
    Fetch,
    /// A local precondition failed. Never reaches the service.
    Validation,
    /// The preview call failed.
    Preview,
    /// The ingest call failed.
    Ingestion,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Fetch => "FetchError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Preview => "PreviewError",
            ErrorKind::Ingestion => "IngestionError",
        };
        f.write_str(name)
    }
}

/// A remote call the workflow issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    ListTables,
    ListColumns,
    Preview,
    Ingest,
}

impl Operation {
    /// How a failure of this call is classified.
    pub fn kind(self) -> ErrorKind {
        match self {
            Operation::Connect => ErrorKind::Connection,
            Operation::ListTables | Operation::ListColumns => ErrorKind::Fetch,
            Operation::Preview => ErrorKind::Preview,
            Operation::Ingest => ErrorKind::Ingestion,
        }
    }

    /// Message shown when the service gives no detail.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Connect => "Connection failed",
            Operation::ListTables => "Failed to fetch tables",
            Operation::ListColumns => "Failed to fetch columns",
            Operation::Preview => "Failed to fetch preview",
            Operation::Ingest => "Ingestion failed",
        }
    }
}

/// The most recent error, attached to the state the workflow fell back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
