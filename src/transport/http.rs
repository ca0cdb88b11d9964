//! HTTP client for the ingestion service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{TransportError, TransportResult};
use super::protocol::{
    ColumnsBody, ConnectAck, ErrorBody, FlatFileConnectBody, IngestRequest, IngestionResult,
    PreviewRequest, PreviewResult, TablesBody,
};
use super::IngestService;
use crate::config::ServiceSettings;
use crate::source::{RelationalSource, UploadedFile};

/// Default timeout for requests (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Service endpoint paths.
pub mod endpoints {
    pub const CONNECT_RELATIONAL: &[&str] = &["connect", "clickhouse"];
    pub const CONNECT_FLAT_FILE: &[&str] = &["connect", "flatfile"];
    pub const TABLES: &[&str] = &["tables"];
    pub const COLUMNS: &str = "columns";
    pub const PREVIEW: &[&str] = &["preview"];
    pub const PREVIEW_FLAT_FILE: &[&str] = &["preview", "flatfile"];
    pub const INGEST_TABLE_TO_FILE: &[&str] = &["ingest", "clickhouse-to-flatfile"];
    pub const INGEST_JOIN_TO_FILE: &[&str] = &["ingest", "clickhouse-join-to-flatfile"];
    pub const INGEST_FILE_TO_TABLE: &[&str] = &["ingest", "flatfile-to-clickhouse"];
}

/// [`IngestService`] over HTTP.
///
/// Plain fields go out as URL-encoded forms, anything carrying the flat file
/// as multipart. Column and table lists are JSON-encoded strings inside the
/// form, the way the service expects them.
///
/// # Example
///
/// ```ignore
/// let service = HttpIngestService::new(&ServiceSettings::default())?;
/// let ack = service.connect_relational(&source).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpIngestService {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpIngestService {
    /// Build a client from service settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or cannot carry a
    /// path, or if the HTTP client cannot be constructed.
    pub fn new(settings: &ServiceSettings) -> TransportResult<Self> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", settings.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(settings.base_url.clone()));
        }

        let timeout = if settings.timeout_seconds == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(settings.timeout_seconds)
        };

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_seconds.max(1)))
            .build()
            .map_err(TransportError::Request)?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve an endpoint below the base URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> TransportResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode a success body.
    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<R> {
        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "service responded");
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if status.is_success() {
            serde_json::from_slice(&body).map_err(TransportError::Decode)
        } else {
            Err(TransportError::Remote {
                status: status.as_u16(),
                detail: ErrorBody::detail_from(&body),
            })
        }
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout.as_secs())
        } else {
            TransportError::Request(err)
        }
    }

    /// Read the uploaded file into a multipart part.
    async fn file_part(file: &UploadedFile) -> TransportResult<Part> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|source| TransportError::Upload {
                path: file.path.clone(),
                source,
            })?;
        Ok(Part::bytes(bytes).file_name(file.file_name()))
    }
}

/// JSON-encode a list for a form field.
fn json_list(items: &[String]) -> TransportResult<String> {
    serde_json::to_string(items).map_err(TransportError::Decode)
}

/// Form fields for a warehouse preview.
pub(crate) fn relational_preview_fields(
    tables: &[String],
    columns: &[String],
    join_condition: Option<&str>,
) -> TransportResult<Vec<(&'static str, String)>> {
    let mut fields = vec![
        ("table", tables.first().cloned().unwrap_or_default()),
        ("columns", json_list(columns)?),
    ];
    if tables.len() > 1 {
        fields.push(("tables", json_list(tables)?));
        fields.push(("join_condition", join_condition.unwrap_or_default().to_string()));
    }
    Ok(fields)
}

/// Endpoint and form fields for a warehouse → file ingestion.
pub(crate) fn to_file_fields(
    tables: &[String],
    columns: &[String],
    join_condition: Option<&str>,
    output_path: &str,
    delimiter: &str,
) -> TransportResult<(&'static [&'static str], Vec<(&'static str, String)>)> {
    if tables.len() > 1 {
        Ok((
            endpoints::INGEST_JOIN_TO_FILE,
            vec![
                ("tables", json_list(tables)?),
                ("columns", json_list(columns)?),
                ("join_condition", join_condition.unwrap_or_default().to_string()),
                ("file_path", output_path.to_string()),
                ("delimiter", delimiter.to_string()),
            ],
        ))
    } else {
        Ok((
            endpoints::INGEST_TABLE_TO_FILE,
            vec![
                ("table", tables.first().cloned().unwrap_or_default()),
                ("columns", json_list(columns)?),
                ("file_path", output_path.to_string()),
                ("delimiter", delimiter.to_string()),
            ],
        ))
    }
}

#[async_trait]
impl IngestService for HttpIngestService {
    async fn connect_relational(&self, source: &RelationalSource) -> TransportResult<ConnectAck> {
        let url = self.endpoint(endpoints::CONNECT_RELATIONAL)?;
        let fields = [
            ("host", source.host.clone()),
            ("port", source.port.to_string()),
            ("database", source.database.clone()),
            ("user", source.user.clone()),
            ("jwt", source.credential.clone()),
        ];
        self.send(self.client.post(url).form(&fields)).await
    }

    async fn connect_flat_file(&self, file: &UploadedFile) -> TransportResult<Vec<String>> {
        let url = self.endpoint(endpoints::CONNECT_FLAT_FILE)?;
        let form = Form::new()
            .part("file", Self::file_part(file).await?)
            .text("delimiter", file.delimiter.clone());

        let body: FlatFileConnectBody = self.send(self.client.post(url).multipart(form)).await?;
        Ok(body.columns)
    }

    async fn list_tables(&self) -> TransportResult<Vec<String>> {
        let url = self.endpoint(endpoints::TABLES)?;
        let body: TablesBody = self.send(self.client.get(url)).await?;
        Ok(body.tables)
    }

    async fn list_columns(&self, table: &str) -> TransportResult<Vec<String>> {
        let url = self.endpoint(&[endpoints::COLUMNS, table])?;
        let body: ColumnsBody = self.send(self.client.get(url)).await?;
        Ok(body.columns)
    }

    async fn preview(&self, request: &PreviewRequest) -> TransportResult<PreviewResult> {
        match request {
            PreviewRequest::Relational {
                tables,
                columns,
                join_condition,
            } => {
                let url = self.endpoint(endpoints::PREVIEW)?;
                let fields = relational_preview_fields(tables, columns, join_condition.as_deref())?;
                self.send(self.client.post(url).form(&fields)).await
            }
            PreviewRequest::FlatFile { file, columns } => {
                let url = self.endpoint(endpoints::PREVIEW_FLAT_FILE)?;
                let form = Form::new()
                    .part("file", Self::file_part(file).await?)
                    .text("columns", json_list(columns)?)
                    .text("delimiter", file.delimiter.clone());
                self.send(self.client.post(url).multipart(form)).await
            }
        }
    }

    async fn ingest(&self, request: &IngestRequest) -> TransportResult<IngestionResult> {
        match request {
            IngestRequest::ToFile {
                tables,
                columns,
                join_condition,
                output_path,
                delimiter,
            } => {
                let (path, fields) = to_file_fields(
                    tables,
                    columns,
                    join_condition.as_deref(),
                    output_path,
                    delimiter,
                )?;
                let url = self.endpoint(path)?;
                self.send(self.client.post(url).form(&fields)).await
            }
            IngestRequest::ToTable {
                file,
                columns,
                table,
            } => {
                let url = self.endpoint(endpoints::INGEST_FILE_TO_TABLE)?;
                let form = Form::new()
                    .part("file", Self::file_part(file).await?)
                    .text("delimiter", file.delimiter.clone())
                    .text("table", table.clone())
                    .text("columns", json_list(columns)?);
                self.send(self.client.post(url).multipart(form)).await
            }
        }
    }
}
