//! Workflow error types.

use thiserror::Error;

use super::state::{ErrorKind, Failure, Operation};
use crate::transport::TransportError;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Fixed validation messages.
pub mod messages {
    pub const NO_SOURCE: &str = "No source connected";
    pub const NO_TABLE: &str = "No table selected";
    pub const NO_COLUMNS: &str = "No columns selected";
    pub const TOO_MANY_TABLES: &str = "At most two tables can be joined";
    pub const TABLES_NEED_WAREHOUSE: &str = "Tables can only be selected for a warehouse source";
    pub const JOIN_REQUIRED: &str = "Join condition required for multiple tables";
    pub const JOIN_INVALID: &str = "Invalid join condition. Use: table1.column = table2.column";
    pub const NO_FILE: &str = "No file uploaded";
    pub const NO_OUTPUT_FILE: &str = "Output file path is required";
    pub const NO_OUTPUT_TABLE: &str = "Output table name is required";
    pub const SELECTION_LOCKED: &str = "Selection cannot change while a request is in flight";
}

/// Errors surfaced to the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// A local precondition failed; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// A service call failed.
    #[error("{message}")]
    Remote {
        kind: ErrorKind,
        message: String,
    },
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify a failed call, keeping the service's detail when it gave one.
    pub fn from_transport(operation: Operation, err: &TransportError) -> Self {
        let message = err
            .detail()
            .map(str::to_string)
            .unwrap_or_else(|| operation.fallback_message().to_string());
        Self::Remote {
            kind: operation.kind(),
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Remote { kind, .. } => *kind,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message) | Self::Remote { message, .. } => message,
        }
    }

    /// The annotation recorded on the workflow for this error.
    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.message().to_string(),
        }
    }
}
