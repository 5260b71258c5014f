//! Audit engine: analyzer execution and the persistence outbox.
mod analyzer;
mod engine;
mod marker;
mod outbox;
mod types;

pub use analyzer::{Analyzer, AnalyzerSettings, HttpAnalyzer};
pub use engine::{EngineConfig, EngineHandle};
pub use marker::{MarkerStore, OutboxError, SavedRunMarker};
pub use outbox::{HttpResultSink, ResultSink, RunRecord, SaveOutbox, SinkError, TaskRecord};
pub use types::{AnalysisError, AnalysisReport, EngineEvent, FailureKind, RunId, TaskKind};
