//! Ingestion workflow.
//!
//! One [`Workflow`] per operator session sequences connect, table and column
//! selection, preview and ingestion against an [`IngestService`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Workflow (machine)                       │
//! │  - WorkflowState + Failure annotation                           │
//! │  - Epoch advanced on every abandoned selection                  │
//! │  ┌──────────────────┐ ┌─────────────────┐ ┌──────────────────┐  │
//! │  │  SelectionStore  │ │  join::validate │ │   SingleFlight   │  │
//! │  │  source, tables, │ │  t0.x = t1.y    │ │  preview/ingest  │  │
//! │  │  columns, result │ │  (ordered)      │ │  admission       │  │
//! │  └──────────────────┘ └─────────────────┘ └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!              │ Pending<R>                     ▲ Settled<R>
//!              ▼                                │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    IngestService (transport)                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ingest_bridge::workflow::Workflow;
//!
//! let mut workflow = Workflow::with_settings(&settings.ingest);
//! workflow.connect(&service, source).await?;
//! workflow.select_tables(&service, vec!["orders".into()]).await?;
//! workflow.select_columns(vec!["orders.id".into(), "orders.total".into()])?;
//! workflow.preview(&service).await?;
//! println!("{}", workflow.status().unwrap_or_default());
//! ```
//!
//! [`IngestService`]: crate::transport::IngestService

mod error;
mod guard;
pub mod join;
mod machine;
mod pending;
mod selection;
mod state;

pub use error::{messages, WorkflowError, WorkflowResult};
pub use guard::{FlightPermit, SingleFlight};
pub use machine::Workflow;
pub use pending::{
    ColumnFetch, ConnectCall, Epoch, Outcome, Pending, ServiceCall, Settled, TableListing,
};
pub use selection::{SelectionStore, MAX_TABLES};
pub use state::{ErrorKind, Failure, Operation, WorkflowState};
