//! In-memory ingestion service shared by the workflow tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ingest_bridge::source::{FlatFileSource, RelationalSource, Source, UploadedFile};
use ingest_bridge::transport::{
    ConnectAck, IngestRequest, IngestService, IngestionResult, PreviewRequest, PreviewResult, Row,
    TransportError, TransportResult,
};
use ingest_bridge::workflow::Operation;
use serde_json::json;
use tokio::sync::Notify;

/// A call the mock received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ConnectRelational { host: String },
    ConnectFlatFile { path: PathBuf, delimiter: String },
    ListTables,
    ListColumns(String),
    Preview(PreviewRequest),
    Ingest(IngestRequest),
}

#[derive(Debug, Clone)]
enum Injected {
    Remote(Option<String>),
    Timeout,
}

#[derive(Default)]
pub struct MockService {
    tables: Vec<String>,
    columns: HashMap<String, Vec<String>>,
    file_columns: Vec<String>,
    preview_rows: usize,
    record_count: u64,
    failures: Mutex<HashMap<Operation, Injected>>,
    gates: Mutex<HashMap<Operation, Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockService {
    /// Warehouse with `orders` and `customers`, a three-column flat file,
    /// three preview rows and 150 ingested records.
    pub fn new() -> Self {
        let mut columns = HashMap::new();
        columns.insert(
            "orders".to_string(),
            strings(&["id", "customer_id", "total"]),
        );
        columns.insert("customers".to_string(), strings(&["id", "name"]));

        Self {
            tables: strings(&["orders", "customers"]),
            columns,
            file_columns: strings(&["region", "amount", "day"]),
            preview_rows: 3,
            record_count: 150,
            ..Self::default()
        }
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    pub fn with_record_count(mut self, count: u64) -> Self {
        self.record_count = count;
        self
    }

    /// Make every later call of `operation` fail with the given detail.
    pub fn fail(&self, operation: Operation, detail: Option<&str>) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation, Injected::Remote(detail.map(str::to_string)));
    }

    /// Make every later call of `operation` time out.
    pub fn time_out(&self, operation: Operation) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation, Injected::Timeout);
    }

    pub fn recover(&self, operation: Operation) {
        self.failures.lock().unwrap().remove(&operation);
    }

    /// Hold the next response to `operation` until the returned gate is
    /// notified.
    pub fn hold(&self, operation: Operation) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(operation, Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn previews(&self) -> Vec<PreviewRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Preview(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn ingests(&self) -> Vec<IngestRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Ingest(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    async fn enter(&self, operation: Operation, call: Call) -> TransportResult<()> {
        self.calls.lock().unwrap().push(call);

        let gate = self.gates.lock().unwrap().remove(&operation);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let injected = self.failures.lock().unwrap().get(&operation).cloned();
        match injected {
            None => Ok(()),
            Some(Injected::Remote(detail)) => Err(TransportError::remote(400, detail)),
            Some(Injected::Timeout) => Err(TransportError::Timeout(30)),
        }
    }

    fn rows(&self, columns: &[String]) -> Vec<Row> {
        (0..self.preview_rows)
            .map(|i| {
                columns
                    .iter()
                    .map(|c| (c.clone(), json!(i)))
                    .collect::<Row>()
            })
            .collect()
    }
}

#[async_trait]
impl IngestService for MockService {
    async fn connect_relational(&self, source: &RelationalSource) -> TransportResult<ConnectAck> {
        let call = Call::ConnectRelational {
            host: source.host.clone(),
        };
        self.enter(Operation::Connect, call).await?;
        Ok(ConnectAck {
            message: "Connected to ClickHouse successfully".to_string(),
        })
    }

    async fn connect_flat_file(&self, file: &UploadedFile) -> TransportResult<Vec<String>> {
        let call = Call::ConnectFlatFile {
            path: file.path.clone(),
            delimiter: file.delimiter.clone(),
        };
        self.enter(Operation::Connect, call).await?;
        Ok(self.file_columns.clone())
    }

    async fn list_tables(&self) -> TransportResult<Vec<String>> {
        self.enter(Operation::ListTables, Call::ListTables).await?;
        Ok(self.tables.clone())
    }

    async fn list_columns(&self, table: &str) -> TransportResult<Vec<String>> {
        self.enter(Operation::ListColumns, Call::ListColumns(table.to_string()))
            .await?;
        self.columns.get(table).cloned().ok_or_else(|| {
            TransportError::remote(404, Some(format!("Table default.{} does not exist", table)))
        })
    }

    async fn preview(&self, request: &PreviewRequest) -> TransportResult<PreviewResult> {
        self.enter(Operation::Preview, Call::Preview(request.clone()))
            .await?;
        Ok(PreviewResult::new(self.rows(request.columns())))
    }

    async fn ingest(&self, request: &IngestRequest) -> TransportResult<IngestionResult> {
        self.enter(Operation::Ingest, Call::Ingest(request.clone()))
            .await?;
        Ok(IngestionResult {
            record_count: self.record_count,
        })
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn warehouse() -> Source {
    Source::Relational(RelationalSource::new(
        "localhost",
        8123,
        "default",
        "default",
        "token",
    ))
}

pub fn flat_file() -> Source {
    Source::FlatFile(FlatFileSource::new("/data/sales.csv", ";"))
}
