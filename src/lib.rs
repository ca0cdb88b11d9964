//! # Ingest Bridge
//!
//! Drives warehouse ↔ flat-file ingestion through a remote ingestion service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            Operator (CLI or embedding application)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │ events
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Workflow (state machine)                │
//! │   selection store · join validator · single-flight guard │
//! └─────────────────────────────────────────────────────────┘
//!                          │ Pending / Settled (epoch-tagged)
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │              IngestService (transport adapter)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │ HTTP
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │      Ingestion service (warehouse, CSV, file writes)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The workflow owns every invariant: which step is live, which selections
//! are valid, which requests may be issued, and which results are still
//! current. Everything that touches data lives behind [`transport`].

pub mod config;
pub mod source;
pub mod transport;
pub mod workflow;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::source::{Direction, FlatFileSource, OutputTarget, RelationalSource, Source};
    pub use crate::transport::{
        HttpIngestService, IngestRequest, IngestService, IngestionResult, PreviewRequest,
        PreviewResult, TransportError,
    };
    pub use crate::workflow::{
        ErrorKind, Failure, Outcome, Workflow, WorkflowError, WorkflowResult, WorkflowState,
    };
}

pub use source::Source;
pub use workflow::{Workflow, WorkflowError, WorkflowState};
