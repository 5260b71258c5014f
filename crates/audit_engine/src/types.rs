use std::fmt;
use std::time::Duration;

use serde_json::Value;

pub type RunId = u64;

/// Engine-side task enumeration; the shell maps it to and from the core's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Performance,
    Monitor,
    Ssl,
    Dns,
    Sitemap,
    Api,
    Links,
    Typography,
}

impl TaskKind {
    pub const ALL: [TaskKind; 8] = [
        TaskKind::Performance,
        TaskKind::Monitor,
        TaskKind::Ssl,
        TaskKind::Dns,
        TaskKind::Sitemap,
        TaskKind::Api,
        TaskKind::Links,
        TaskKind::Typography,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Performance => "performance",
            TaskKind::Monitor => "monitor",
            TaskKind::Ssl => "ssl",
            TaskKind::Dns => "dns",
            TaskKind::Sitemap => "sitemap",
            TaskKind::Api => "api",
            TaskKind::Links => "links",
            TaskKind::Typography => "typography",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every event carries the run id it belongs to; consumers fence off runs
/// that have since been superseded or stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TaskStarted {
        run_id: RunId,
        kind: TaskKind,
    },
    TaskFinished {
        run_id: RunId,
        kind: TaskKind,
        result: Result<AnalysisReport, AnalysisError>,
        elapsed: Duration,
    },
}

/// Successful analyzer output. The payload shape is task-specific and
/// opaque to everything upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    pub kind: FailureKind,
    pub message: String,
}

impl AnalysisError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
