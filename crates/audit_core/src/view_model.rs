use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{RunId, TaskKind, TaskState};

/// Aggregate task tallies for the current run's selection. The UI shows
/// these side by side; there is no single pass/fail verdict for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounts {
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRowView {
    pub kind: TaskKind,
    pub state: TaskState,
    pub duration: Option<Duration>,
    pub error: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuditViewModel {
    pub url: Option<String>,
    pub run_id: RunId,
    pub context_id: Option<String>,
    pub is_running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_completed_run_id: Option<RunId>,
    pub rows: Vec<TaskRowView>,
    pub counts: RunCounts,
    pub dirty: bool,
}
