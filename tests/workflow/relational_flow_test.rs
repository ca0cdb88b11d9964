#[path = "../common/mod.rs"]
mod common;

use common::{strings, warehouse, Call, MockService};
use ingest_bridge::source::{RelationalSource, Source};
use ingest_bridge::transport::{IngestRequest, PreviewRequest};
use ingest_bridge::workflow::{ErrorKind, Operation, Outcome, Workflow, WorkflowState};
use insta::assert_snapshot;

async fn connected(service: &MockService) -> Workflow {
    let mut workflow = Workflow::new();
    let outcome = workflow.connect(service, warehouse()).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);
    workflow
}

async fn columns_ready(service: &MockService, tables: &[&str], columns: &[&str]) -> Workflow {
    let mut workflow = connected(service).await;
    workflow
        .select_tables(service, strings(tables))
        .await
        .unwrap();
    workflow.select_columns(strings(columns)).unwrap();
    assert_eq!(workflow.state(), WorkflowState::ColumnsReady);
    workflow
}

#[tokio::test]
async fn test_single_table_preview() {
    let service = MockService::new();
    let mut workflow = columns_ready(&service, &["orders"], &["orders.id", "orders.total"]).await;

    let outcome = workflow.preview(&service).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);

    assert_eq!(
        service.previews(),
        vec![PreviewRequest::Relational {
            tables: strings(&["orders"]),
            columns: strings(&["orders.id", "orders.total"]),
            join_condition: None,
        }]
    );
    assert_eq!(workflow.state(), WorkflowState::PreviewReady);
    assert_eq!(workflow.selection().preview().map(|p| p.count), Some(3));
    assert_eq!(workflow.status().as_deref(), Some("Preview: 3 records"));
    assert!(!workflow.is_busy());
}

#[tokio::test]
async fn test_single_table_ignores_join_condition() {
    let service = MockService::new();
    let mut workflow = columns_ready(&service, &["orders"], &["orders.id"]).await;
    workflow.set_join_condition("this is not a join");

    workflow.preview(&service).await.unwrap();
    assert_eq!(workflow.state(), WorkflowState::PreviewReady);
}

#[tokio::test]
async fn test_two_table_preview_requires_ordered_join() {
    let service = MockService::new();
    let mut workflow = columns_ready(
        &service,
        &["orders", "customers"],
        &["orders.id", "customers.name"],
    )
    .await;

    workflow.set_join_condition("customers.id = orders.customer_id");
    let err = workflow.preview(&service).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_snapshot!(err.message(), @"Invalid join condition. Use: table1.column = table2.column");
    assert!(service.previews().is_empty());
    assert_eq!(workflow.state(), WorkflowState::ColumnsReady);
    assert!(!workflow.is_busy());

    workflow.set_join_condition("orders.customer_id = customers.id");
    workflow.preview(&service).await.unwrap();
    assert_eq!(workflow.state(), WorkflowState::PreviewReady);
    assert!(workflow.failure().is_none());
    assert_eq!(
        service.previews(),
        vec![PreviewRequest::Relational {
            tables: strings(&["orders", "customers"]),
            columns: strings(&["orders.id", "customers.name"]),
            join_condition: Some("orders.customer_id = customers.id".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_two_tables_without_join() {
    let service = MockService::new();
    let mut workflow =
        columns_ready(&service, &["orders", "customers"], &["customers.name"]).await;

    let err = workflow.preview(&service).await.unwrap_err();
    assert_snapshot!(err.message(), @"Join condition required for multiple tables");
    assert!(service.previews().is_empty());
}

#[tokio::test]
async fn test_column_universe_is_qualified() {
    let service = MockService::new();
    let mut workflow = connected(&service).await;
    workflow
        .select_tables(&service, strings(&["customers", "orders"]))
        .await
        .unwrap();

    assert_eq!(workflow.state(), WorkflowState::TablesSelected);
    assert_eq!(
        workflow.selection().column_universe(),
        strings(&[
            "customers.id",
            "customers.name",
            "orders.id",
            "orders.customer_id",
            "orders.total",
        ])
        .as_slice()
    );

    let err = workflow.select_columns(strings(&["id"])).unwrap_err();
    assert_eq!(err.message(), "Unknown column: id");
    assert_eq!(workflow.state(), WorkflowState::TablesSelected);
}

#[tokio::test]
async fn test_ingest_completes_and_clears_outputs() {
    let service = MockService::new();
    let mut workflow = columns_ready(
        &service,
        &["orders", "customers"],
        &["orders.id", "customers.name"],
    )
    .await;
    workflow.set_join_condition("orders.customer_id = customers.id");
    workflow.preview(&service).await.unwrap();

    workflow.set_output_target("/exports/orders.csv");
    let outcome = workflow.ingest(&service).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);

    assert_eq!(workflow.state(), WorkflowState::Completed);
    assert_eq!(workflow.record_count(), Some(150));
    assert!(workflow.selection().preview().is_none());
    assert!(workflow.selection().output_target().is_empty());
    assert!(workflow.selection().join_condition().is_empty());
    assert_eq!(workflow.status().as_deref(), Some("Ingestion complete"));

    assert_eq!(
        service.ingests(),
        vec![IngestRequest::ToFile {
            tables: strings(&["orders", "customers"]),
            columns: strings(&["orders.id", "customers.name"]),
            join_condition: Some("orders.customer_id = customers.id".to_string()),
            output_path: "/exports/orders.csv".to_string(),
            delimiter: ",".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_ingest_requires_output_path() {
    let service = MockService::new();
    let mut workflow = columns_ready(&service, &["orders"], &["orders.id"]).await;
    workflow.set_output_target("   ");

    let err = workflow.ingest(&service).await.unwrap_err();
    assert_snapshot!(err.message(), @"Output file path is required");
    assert!(service.ingests().is_empty());
    assert_eq!(workflow.state(), WorkflowState::ColumnsReady);
    assert_eq!(
        workflow.failure().map(|f| f.to_string()).as_deref(),
        Some("ValidationError: Output file path is required")
    );
}

#[tokio::test]
async fn test_reset_from_completed() {
    let service = MockService::new();
    let mut workflow = columns_ready(&service, &["orders"], &["orders.id"]).await;
    workflow.set_output_target("/exports/orders.csv");
    workflow.ingest(&service).await.unwrap();
    assert_eq!(workflow.state(), WorkflowState::Completed);

    workflow.reset();
    assert_eq!(workflow.state(), WorkflowState::Disconnected);
    assert!(workflow.selection().is_empty());
    assert!(workflow.failure().is_none());
    assert!(workflow.record_count().is_none());
    assert!(workflow.status().is_none());
}

#[tokio::test]
async fn test_preview_failure_returns_to_columns_ready() {
    let service = MockService::new();
    let mut workflow = columns_ready(&service, &["orders"], &["orders.id"]).await;
    workflow.preview(&service).await.unwrap();

    service.fail(Operation::Preview, Some("Code: 60. Table default.orders is locked"));
    let err = workflow.preview(&service).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Preview);
    assert_eq!(err.message(), "Code: 60. Table default.orders is locked");
    assert_eq!(workflow.state(), WorkflowState::ColumnsReady);
    assert!(workflow.selection().preview().is_none());
    assert!(!workflow.is_busy());

    service.recover(Operation::Preview);
    workflow.preview(&service).await.unwrap();
    assert_eq!(workflow.state(), WorkflowState::PreviewReady);
    assert!(workflow.failure().is_none());
}

#[tokio::test]
async fn test_ingest_failure_returns_to_issuing_state() {
    let service = MockService::new();
    let mut workflow = columns_ready(&service, &["orders"], &["orders.id"]).await;
    workflow.preview(&service).await.unwrap();
    workflow.set_output_target("/exports/orders.csv");

    service.time_out(Operation::Ingest);
    let err = workflow.ingest(&service).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ingestion);
    assert_snapshot!(
        workflow.failure().map(|f| f.to_string()).unwrap_or_default(),
        @"IngestionError: Ingestion failed"
    );
    assert_eq!(workflow.state(), WorkflowState::PreviewReady);
    assert!(workflow.selection().preview().is_some());
    assert_eq!(workflow.selection().output_target(), "/exports/orders.csv");
    assert!(!workflow.is_busy());
}

#[tokio::test]
async fn test_connect_failure_stays_disconnected() {
    let service = MockService::new();
    service.fail(Operation::Connect, Some("Authentication failed: token expired"));

    let mut workflow = Workflow::new();
    let err = workflow.connect(&service, warehouse()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(workflow.state(), WorkflowState::Disconnected);
    assert_snapshot!(
        workflow.failure().map(|f| f.to_string()).unwrap_or_default(),
        @"ConnectionError: Authentication failed: token expired"
    );
    assert!(workflow.selection().source().is_none());
}

#[tokio::test]
async fn test_invalid_source_is_not_sent() {
    let service = MockService::new();
    let mut workflow = Workflow::new();
    let source = Source::Relational(RelationalSource::new("", 8123, "default", "default", "t"));

    let err = workflow.connect(&service, source).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(service.calls().is_empty());
    assert_eq!(workflow.state(), WorkflowState::Disconnected);
}

#[tokio::test]
async fn test_column_fetch_failure() {
    let service = MockService::new();
    let mut workflow = connected(&service).await;

    let err = workflow
        .select_tables(&service, strings(&["orders", "invoices"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert_eq!(err.message(), "Table default.invoices does not exist");
    assert_eq!(workflow.state(), WorkflowState::TablesSelected);
    assert!(workflow.selection().column_universe().is_empty());
}

#[tokio::test]
async fn test_loaded_tables_restrict_selection() {
    let service = MockService::new();
    let mut workflow = connected(&service).await;
    workflow.load_tables(&service).await.unwrap();
    assert_eq!(
        workflow.selection().available_tables(),
        strings(&["orders", "customers"]).as_slice()
    );

    let err = workflow
        .select_tables(&service, strings(&["invoices"]))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Unknown table: invoices");
    assert_eq!(workflow.state(), WorkflowState::Connected);
    assert!(!service.calls().contains(&Call::ListColumns("invoices".to_string())));
}

#[tokio::test]
async fn test_table_listing_failure_uses_fallback() {
    let service = MockService::new();
    let mut workflow = connected(&service).await;
    service.fail(Operation::ListTables, None);

    let err = workflow.load_tables(&service).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert_eq!(err.message(), "Failed to fetch tables");
    assert_eq!(workflow.state(), WorkflowState::Connected);
}

#[tokio::test]
async fn test_changing_tables_resets_selection() {
    let service = MockService::new();
    let mut workflow = columns_ready(
        &service,
        &["orders", "customers"],
        &["orders.id", "customers.name"],
    )
    .await;
    workflow.set_join_condition("orders.customer_id = customers.id");

    workflow
        .select_tables(&service, strings(&["orders"]))
        .await
        .unwrap();
    assert_eq!(workflow.state(), WorkflowState::TablesSelected);
    assert!(workflow.selection().columns().is_empty());
    assert!(workflow.selection().join_condition().is_empty());

    let err = workflow.preview(&service).await.unwrap_err();
    assert_eq!(err.message(), "No columns selected");
}
