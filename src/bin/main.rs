//! Ingest Bridge CLI - Move data between a warehouse and flat files
//!
//! Usage:
//!   ingest-bridge tables [--connection <name>]
//!   ingest-bridge columns <table>... [--connection <name>]
//!   ingest-bridge preview (--table <t>... | --file <path>) [--column <c>...] [--join <cond>]
//!   ingest-bridge ingest (--table <t>... | --file <path>) [--column <c>...] --output <target>
//!
//! Examples:
//!   ingest-bridge preview --table orders --column orders.id --column orders.total
//!   ingest-bridge ingest --table orders --table customers \
//!       --join "orders.customer_id = customers.id" --output /tmp/orders.csv
//!   ingest-bridge ingest --file sales.csv --delimiter ';' --output sales

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use ingest_bridge::config::{source_from_env, ConnectionError, Settings, SettingsError};
use ingest_bridge::source::{FlatFileSource, Source};
use ingest_bridge::transport::{HttpIngestService, TransportError};
use ingest_bridge::workflow::{Outcome, Workflow, WorkflowError};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ingest-bridge")]
#[command(about = "Ingest Bridge - Move tabular data between a warehouse and flat files")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the usual search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the warehouse tables
    Tables {
        #[command(flatten)]
        warehouse: WarehouseArgs,
    },

    /// List the columns of up to two tables
    Columns {
        /// Table names
        #[arg(required = true)]
        tables: Vec<String>,

        #[command(flatten)]
        warehouse: WarehouseArgs,
    },

    /// Fetch a sample of the selected rows
    Preview {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Run a full ingestion
    Ingest {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output file path (from a table) or table name (from a file)
        #[arg(short, long)]
        output: String,
    },
}

#[derive(Args)]
struct WarehouseArgs {
    /// Connection profile from the settings file
    #[arg(long)]
    connection: Option<String>,
}

#[derive(Args)]
struct SelectionArgs {
    #[command(flatten)]
    warehouse: WarehouseArgs,

    /// Flat file to read instead of the warehouse
    #[arg(short, long, conflicts_with = "tables")]
    file: Option<PathBuf>,

    /// Flat file delimiter
    #[arg(short, long, requires = "file")]
    delimiter: Option<String>,

    /// Table to read (repeat for a join)
    #[arg(short, long = "table", num_args = 1)]
    tables: Vec<String>,

    /// Column to select (repeatable, defaults to all)
    #[arg(short, long = "column", num_args = 1)]
    columns: Vec<String>,

    /// Join condition for two tables: t1.col = t2.col
    #[arg(short, long)]
    join: Option<String>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Connection(#[from] ConnectionError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{}", .0.to_failure())]
    Workflow(#[from] WorkflowError),

    #[error("Request was not applied: {0:?}")]
    NotApplied(Outcome),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    let service = HttpIngestService::new(&settings.service)?;
    let mut workflow = Workflow::with_settings(&settings.ingest);

    match cli.command {
        Commands::Tables { warehouse } => {
            let source = warehouse_source(&settings, &warehouse)?;
            applied(workflow.connect(&service, source).await?)?;
            applied(workflow.load_tables(&service).await?)?;
            for table in workflow.selection().available_tables() {
                println!("{}", table);
            }
        }
        Commands::Columns { tables, warehouse } => {
            let source = warehouse_source(&settings, &warehouse)?;
            applied(workflow.connect(&service, source).await?)?;
            applied(workflow.select_tables(&service, tables).await?)?;
            for column in workflow.selection().column_universe() {
                println!("{}", column);
            }
        }
        Commands::Preview { selection } => {
            prepare(&mut workflow, &service, &settings, selection).await?;
            applied(workflow.preview(&service).await?)?;

            if let Some(preview) = workflow.selection().preview() {
                for row in &preview.rows {
                    println!("{}", serde_json::Value::Object(row.clone()));
                }
            }
            if let Some(status) = workflow.status() {
                eprintln!("{}", status);
            }
        }
        Commands::Ingest { selection, output } => {
            prepare(&mut workflow, &service, &settings, selection).await?;
            workflow.set_output_target(output);
            applied(workflow.ingest(&service).await?)?;

            println!("Records processed: {}", workflow.record_count().unwrap_or(0));
        }
    }

    Ok(())
}

/// Connect and apply the selection flags.
async fn prepare(
    workflow: &mut Workflow,
    service: &HttpIngestService,
    settings: &Settings,
    args: SelectionArgs,
) -> Result<(), CliError> {
    let source = match &args.file {
        Some(path) => {
            let delimiter = args
                .delimiter
                .clone()
                .unwrap_or_else(|| settings.ingest.default_delimiter.clone());
            Source::FlatFile(FlatFileSource::new(path.clone(), delimiter))
        }
        None => warehouse_source(settings, &args.warehouse)?,
    };
    applied(workflow.connect(service, source).await?)?;

    if !args.tables.is_empty() {
        applied(workflow.select_tables(service, args.tables).await?)?;
    }
    if let Some(join) = args.join {
        workflow.set_join_condition(join);
    }

    let columns = if args.columns.is_empty() {
        workflow.selection().column_universe().to_vec()
    } else {
        args.columns
    };
    debug!(?columns, "selecting columns");
    workflow.select_columns(columns)?;
    Ok(())
}

/// Resolve the warehouse: named profile, else the default profile, else the
/// `INGEST_DB_*` environment.
fn warehouse_source(settings: &Settings, args: &WarehouseArgs) -> Result<Source, CliError> {
    let source = match &args.connection {
        Some(name) => settings.get_connection(name)?.resolve()?,
        None => match settings.default_connection() {
            Some((name, profile)) => {
                debug!(profile = name, "using default connection");
                profile.resolve()?
            }
            None => source_from_env()?,
        },
    };
    Ok(Source::Relational(source))
}

fn applied(outcome: Outcome) -> Result<(), CliError> {
    match outcome {
        Outcome::Applied => Ok(()),
        other => Err(CliError::NotApplied(other)),
    }
}
