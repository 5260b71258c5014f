use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use audit_logging::{audit_error, audit_info, audit_warn};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::marker::{MarkerStore, SavedRunMarker};
use crate::RunId;

/// Serializable form of a completed run, uploaded by the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub context_id: Option<String>,
    pub url: String,
    pub started_at: String,
    pub ended_at: String,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub kind: String,
    pub outcome: String,
    pub duration_ms: Option<u64>,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("network: {0}")]
    Network(String),
}

/// Destination for completed-run uploads.
#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn store(&self, record: &RunRecord) -> Result<(), SinkError>;
}

/// Sink backed by the backend persistence endpoint.
#[derive(Debug, Clone)]
pub struct HttpResultSink {
    endpoint: String,
    request_timeout: Duration,
}

impl HttpResultSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait::async_trait]
impl ResultSink for HttpResultSink {
    async fn store(&self, record: &RunRecord) -> Result<(), SinkError> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|err| SinkError::Network(err.to_string()))?;

        let response = client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|err| SinkError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}

/// At-most-once persistence trigger for completed runs, double-guarded by
/// an in-memory id and the durable marker.
pub struct SaveOutbox {
    marker: MarkerStore,
    sink: Arc<dyn ResultSink>,
    last_triggered: Option<RunId>,
    inflight: Option<JoinHandle<()>>,
}

impl SaveOutbox {
    pub fn new(marker: MarkerStore, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            marker,
            sink,
            last_triggered: None,
            inflight: None,
        }
    }

    /// The run id recorded in the durable marker, if any. Read at startup
    /// so a reload does not re-save an already-persisted run.
    pub fn saved_run_id(&self) -> Option<RunId> {
        match self.marker.load() {
            Ok(marker) => marker.map(|m| m.run_id),
            Err(err) => {
                audit_warn!("Failed to read saved-run marker: {}", err);
                None
            }
        }
    }

    /// Fire-and-forget save. Returns true when the record was handed to
    /// the sink, false when this run id was already triggered or saved.
    /// Upload failures are logged and never retried.
    pub fn trigger(&mut self, record: RunRecord) -> bool {
        let run_id = record.run_id;
        if self.last_triggered == Some(run_id) {
            return false;
        }
        match self.marker.load() {
            Ok(Some(marker)) if marker.run_id == run_id => {
                self.last_triggered = Some(run_id);
                return false;
            }
            Ok(_) => {}
            Err(err) => {
                audit_warn!("Saved-run marker unreadable, saving anyway: {}", err);
            }
        }

        // The marker is written before the upload: persistence is
        // at-most-once, not at-least-once.
        let marker = SavedRunMarker {
            run_id,
            timestamp: Utc::now().timestamp_millis(),
        };
        if let Err(err) = self.marker.record(marker) {
            audit_warn!("Failed to record saved-run marker for run {}: {}", run_id, err);
        }
        self.last_triggered = Some(run_id);

        let sink = self.sink.clone();
        let handle = thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    audit_error!("Background save runtime failed: {}", err);
                    return;
                }
            };
            match runtime.block_on(sink.store(&record)) {
                Ok(()) => audit_info!("Saved run {} in background", run_id),
                Err(err) => audit_error!("Background save for run {} failed: {}", run_id, err),
            }
        });
        self.inflight = Some(handle);
        true
    }

    /// Wait for an in-flight background save. Called on shutdown so the
    /// process does not exit under the upload.
    pub fn join_inflight(&mut self) {
        if let Some(handle) = self.inflight.take() {
            let _ = handle.join();
        }
    }
}
