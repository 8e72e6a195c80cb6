//! Telemetry collector
//!
//! Browser-facing capture endpoint. Each `POST /store-data` appends the
//! record to a CSV file in the training layout (unlabeled) and answers with
//! the predicted class name.

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::api::{panic_response, permissive_cors, ApiError, ApiResult, ModelState};
use crate::metrics::ServiceMetrics;
use crate::types::prediction::CaptureResponse;
use crate::types::telemetry::{TelemetryRequest, TelemetryRow};

pub const SAVED_MESSAGE: &str = "Data saved successfully";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("capture CSV encoding error: {0}")]
    Csv(#[from] csv::Error),
}

/// Serialised appends to the capture CSV
#[derive(Debug)]
pub struct CaptureWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CaptureWriter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first when the file is new or empty.
    pub async fn append(&self, row: &TelemetryRow) -> Result<(), CaptureError> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let needs_header = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(Vec::new());
        writer.serialize(row)?;
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            header = needs_header,
            "Telemetry row captured"
        );
        Ok(())
    }
}

/// Shared collector state
#[derive(Clone)]
pub struct CollectorState {
    pub model: ModelState,
    pub writer: Arc<CaptureWriter>,
    pub metrics: Arc<ServiceMetrics>,
}

impl CollectorState {
    pub fn new(model: ModelState, writer: CaptureWriter) -> Self {
        Self {
            model,
            writer: Arc::new(writer),
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }
}

/// Create the collector router
pub fn create_collector_router(state: CollectorState) -> Router {
    info!(capture_path = %state.writer.path().display(), "Collector capture file");
    Router::new()
        .route("/store-data", post(store_data))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(permissive_cors())
}

/// `POST /store-data`
pub async fn store_data(
    State(state): State<CollectorState>,
    body: Bytes,
) -> ApiResult<Json<CaptureResponse>> {
    let started = Instant::now();

    match capture(&state, &body).await {
        Ok((label, probability)) => {
            state
                .metrics
                .record_prediction(&label, probability, started.elapsed());
            Ok(Json(CaptureResponse {
                message: SAVED_MESSAGE.to_string(),
                prediction: label,
            }))
        }
        Err(err) => {
            state.metrics.record_rejection(err.kind(), started.elapsed());
            warn!(kind = err.kind(), error = %err, "Capture request failed");
            Err(err)
        }
    }
}

async fn capture(state: &CollectorState, body: &[u8]) -> ApiResult<(String, f64)> {
    let request = TelemetryRequest::from_slice(body)?;

    state.writer.append(&request.to_row()).await.map_err(|e| {
        error!(error = %e, path = %state.writer.path().display(), "Failed to write capture file");
        ApiError::CaptureWrite(e.to_string())
    })?;

    let prediction = state
        .model
        .engine()
        .and_then(|engine| {
            engine
                .predict(&request.to_telemetry())
                .map_err(ApiError::from)
        })
        .map_err(|e| {
            error!(error = %e, "Failed to classify captured telemetry");
            ApiError::CapturePrediction(e.to_string())
        })?;

    Ok((prediction.label, prediction.probability))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(clicks: &str) -> TelemetryRow {
        TelemetryRow {
            mouse_movements: "3".to_string(),
            screen_width: "1920".to_string(),
            clicks: clicks.to_string(),
            user_agent: "Mozilla/5.0 (X11, Linux)".to_string(),
            ..TelemetryRow::default()
        }
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture").join("captured.csv");
        let writer = CaptureWriter::new(&path);

        writer.append(&row("1")).await.unwrap();
        writer.append(&row("2")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("mouseMovements,screenWidth"));
        assert!(lines[0].ends_with(",label"));
        assert!(lines[2].contains("\"Mozilla/5.0 (X11, Linux)\""));
    }

    #[tokio::test]
    async fn test_captured_rows_read_back_as_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captured.csv");
        let writer = CaptureWriter::new(&path);

        writer.append(&row("4")).await.unwrap();

        let rows = crate::training::dataset::load_dataset(&path).unwrap();
        let parsed = rows[0].as_ref().unwrap();
        assert_eq!(parsed.clicks, "4");
        assert_eq!(parsed.label, "");
    }
}
