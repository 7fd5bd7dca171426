//! Workspace umbrella crate for chartdeck.
//!
//! This crate stitches the tabular parser, the record normalizer and the
//! dataset store into one upload pipeline, so the HTTP layer (or any other
//! caller) turns a file name plus bytes into a stored dataset with a single
//! call to [`upload_dataset`].

pub use store::{
    BackendConfig, DatasetStore, DocumentStore, StatusLog, StatusRecord, StoreBackend,
    StoreConfig, StoreError,
};
pub use tabular::{
    normalize, normalize_with, parse_table, CellValue, ColumnKind, DatasetRecord, ParsedTable,
    RecordStamper, Row, SystemStamper, TabularConfig, TabularError,
};

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The only file extension accepted for upload.
pub const SUPPORTED_EXTENSION: &str = ".csv";

/// Number of rows echoed back in an upload summary.
pub const PREVIEW_ROWS: usize = 5;

/// Errors that can occur while turning an upload into a stored dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The file name does not end in [`SUPPORTED_EXTENSION`].
    UnsupportedFileType(String),
    /// The contents could not be parsed as a table.
    Ingestion(TabularError),
    /// The store rejected the record.
    Store(StoreError),
    /// Parsing did not finish within the allotted time. Nothing was stored.
    Timeout(Duration),
    /// The parse task panicked or was cancelled.
    Interrupted(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::UnsupportedFileType(name) => {
                write!(f, "unsupported file type for '{name}': expected {SUPPORTED_EXTENSION}")
            }
            UploadError::Ingestion(err) => write!(f, "{err}"),
            UploadError::Store(err) => write!(f, "{err}"),
            UploadError::Timeout(budget) => {
                write!(f, "parsing did not finish within {}ms", budget.as_millis())
            }
            UploadError::Interrupted(reason) => write!(f, "parse task interrupted: {reason}"),
        }
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            UploadError::Ingestion(err) => Some(err),
            UploadError::Store(err) => Some(err),
            UploadError::UnsupportedFileType(_)
            | UploadError::Timeout(_)
            | UploadError::Interrupted(_) => None,
        }
    }
}

impl From<TabularError> for UploadError {
    fn from(value: TabularError) -> Self {
        UploadError::Ingestion(value)
    }
}

impl From<StoreError> for UploadError {
    fn from(value: StoreError) -> Self {
        UploadError::Store(value)
    }
}

/// What the caller gets back after a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    /// Identifier the dataset is retrievable under.
    pub id: String,
    pub filename: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    /// The first [`PREVIEW_ROWS`] rows.
    pub sample_data: Vec<Row>,
}

impl UploadSummary {
    pub fn from_record(stored_id: impl Into<String>, record: &DatasetRecord) -> Self {
        Self {
            id: stored_id.into(),
            filename: record.filename.clone(),
            columns: record.columns.clone(),
            row_count: record.row_count(),
            sample_data: record.preview(PREVIEW_ROWS).to_vec(),
        }
    }
}

/// Metrics observer for upload stages.
pub trait UploadMetrics: Send + Sync {
    fn record_parse(&self, latency: Duration, result: Result<(), TabularError>);
    fn record_store(&self, latency: Duration, result: Result<(), StoreError>);
}

/// Install or clear the global upload metrics recorder.
pub fn set_upload_metrics(recorder: Option<Arc<dyn UploadMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn UploadMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn UploadMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn UploadMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn UploadMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_parse(self, result: Result<(), TabularError>) {
        self.recorder.record_parse(self.start.elapsed(), result);
    }

    fn record_store(self, result: Result<(), StoreError>) {
        self.recorder.record_store(self.start.elapsed(), result);
    }
}

/// Whether `filename` carries the recognized tabular extension.
pub fn is_supported_filename(filename: &str) -> bool {
    filename.ends_with(SUPPORTED_EXTENSION)
}

/// Check, parse and normalize an upload without storing it.
pub fn ingest_upload(
    filename: &str,
    bytes: &[u8],
    cfg: &TabularConfig,
) -> Result<DatasetRecord, UploadError> {
    ingest_upload_with(filename, bytes, cfg, &SystemStamper)
}

/// [`ingest_upload`] with an explicit id/clock source.
pub fn ingest_upload_with(
    filename: &str,
    bytes: &[u8],
    cfg: &TabularConfig,
    stamper: &dyn RecordStamper,
) -> Result<DatasetRecord, UploadError> {
    if !is_supported_filename(filename) {
        return Err(UploadError::UnsupportedFileType(filename.to_string()));
    }

    let span = MetricsSpan::start();
    let parsed = parse_table(bytes, cfg);
    if let Some(span) = span {
        span.record_parse(parsed.as_ref().map(|_| ()).map_err(Clone::clone));
    }

    Ok(normalize_with(parsed?, filename, stamper))
}

/// Run the whole upload: extension check, parse, normalize, insert.
///
/// Parsing runs on the blocking pool. Nothing is stored unless every earlier
/// step succeeded. The summary carries the id returned by the store, which is
/// the one to fetch the dataset by.
pub async fn upload_dataset(
    store: &dyn DatasetStore,
    filename: &str,
    bytes: impl Into<Vec<u8>>,
    cfg: &TabularConfig,
) -> Result<UploadSummary, UploadError> {
    run_upload(store, filename, bytes.into(), cfg, None).await
}

/// [`upload_dataset`] with a deadline on the parse stage.
///
/// If parsing and normalizing take longer than `budget` the upload fails with
/// [`UploadError::Timeout`] and the store is never touched. Once the insert
/// has started it is awaited to completion, so a caller never reports a
/// timeout for a dataset that was in fact stored.
pub async fn upload_dataset_within(
    store: &dyn DatasetStore,
    filename: &str,
    bytes: impl Into<Vec<u8>>,
    cfg: &TabularConfig,
    budget: Duration,
) -> Result<UploadSummary, UploadError> {
    run_upload(store, filename, bytes.into(), cfg, Some(budget)).await
}

async fn run_upload(
    store: &dyn DatasetStore,
    filename: &str,
    bytes: Vec<u8>,
    cfg: &TabularConfig,
    budget: Option<Duration>,
) -> Result<UploadSummary, UploadError> {
    let start = Instant::now();
    let size = bytes.len();
    match upload_inner(store, filename, bytes, cfg, budget).await {
        Ok(summary) => {
            info!(
                id = %summary.id,
                filename = %summary.filename,
                rows = summary.row_count,
                columns = summary.columns.len(),
                elapsed_micros = start.elapsed().as_micros(),
                "upload_success"
            );
            Ok(summary)
        }
        Err(err) => {
            warn!(
                filename = %filename,
                bytes = size,
                error = %err,
                elapsed_micros = start.elapsed().as_micros(),
                "upload_failure"
            );
            Err(err)
        }
    }
}

async fn upload_inner(
    store: &dyn DatasetStore,
    filename: &str,
    bytes: Vec<u8>,
    cfg: &TabularConfig,
    budget: Option<Duration>,
) -> Result<UploadSummary, UploadError> {
    let ingest = ingest_blocking(filename, bytes, cfg);
    let record = match budget {
        Some(budget) => tokio::time::timeout(budget, ingest)
            .await
            .map_err(|_| UploadError::Timeout(budget))??,
        None => ingest.await?,
    };

    let span = MetricsSpan::start();
    let stored = store.insert_dataset(&record).await;
    if let Some(span) = span {
        span.record_store(stored.as_ref().map(|_| ()).map_err(Clone::clone));
    }

    Ok(UploadSummary::from_record(stored?, &record))
}

/// [`ingest_upload`] on the blocking pool.
async fn ingest_blocking(
    filename: &str,
    bytes: Vec<u8>,
    cfg: &TabularConfig,
) -> Result<DatasetRecord, UploadError> {
    let filename = filename.to_string();
    let cfg = cfg.clone();
    tokio::task::spawn_blocking(move || ingest_upload(&filename, &bytes, &cfg))
        .await
        .map_err(|e| UploadError::Interrupted(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_exact() {
        assert!(is_supported_filename("report.csv"));
        assert!(is_supported_filename(".csv"));
        assert!(!is_supported_filename("report.txt"));
        assert!(!is_supported_filename("report.CSV"));
        assert!(!is_supported_filename("report.csv.gz"));
        assert!(!is_supported_filename(""));
    }

    #[test]
    fn upload_error_display_embeds_cause() {
        let err = UploadError::from(TabularError::MalformedTable("header row is empty".into()));
        assert_eq!(err.to_string(), "malformed table: header row is empty");
        assert!(err.source().is_some());

        let err = UploadError::UnsupportedFileType("report.txt".into());
        assert!(err.to_string().contains("report.txt"));
        assert!(err.source().is_none());

        let err = UploadError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "parsing did not finish within 1500ms");
    }
}
