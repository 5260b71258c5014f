use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{RunId, TaskKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User submitted a target URL with a set of analysis tasks.
    AuditSubmitted {
        url: String,
        tasks: Vec<TaskKind>,
        context_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// Engine notification that a task began executing.
    TaskStarted { run_id: RunId, kind: TaskKind },
    /// Engine notification that a task reached a terminal outcome.
    TaskFinished {
        run_id: RunId,
        kind: TaskKind,
        outcome: Result<Value, String>,
        duration: Duration,
        at: DateTime<Utc>,
    },
    /// User clicked Stop.
    StopClicked { at: DateTime<Utc> },
    /// User clicked Clear.
    ClearClicked,
    /// Outbox confirmation that a completed run was handed to persistence.
    RunSaved { run_id: RunId },
    /// Restore the durable saved-run marker from disk on startup.
    RestoreSavedMarker { run_id: RunId },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
