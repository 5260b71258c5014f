use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::view_model::{AuditViewModel, RunCounts, TaskRowView};

pub type RunId = u64;

/// The fixed set of analysis tasks an audit can run against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
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

/// Lifecycle of a single task within a run. Tasks only move forward:
/// `Pending -> Running -> {Success|Error|Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Success,
    Error,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Error | TaskState::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Opaque analyzer payload, present on success.
    pub data: Option<Value>,
    /// Failure description for display, present on error.
    pub error: Option<String>,
    /// Wall-clock time the task spent running, set on terminal transition.
    pub duration: Option<Duration>,
}

/// Serializable summary of a fully completed run, handed to persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: RunId,
    pub context_id: Option<String>,
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub tasks: Vec<TaskReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub kind: TaskKind,
    pub state: TaskState,
    pub duration: Option<Duration>,
    pub data: Option<Value>,
    pub error: Option<String>,
}

/// Normalize a user-entered target for comparison and display: lowercase,
/// scheme and `www.` stripped, anything past the host removed.
pub fn normalize_target(raw: &str) -> String {
    let mut target = raw.trim().to_ascii_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = target.strip_prefix(scheme) {
            target = rest.to_string();
            break;
        }
    }
    if let Some(rest) = target.strip_prefix("www.") {
        target = rest.to_string();
    }
    if let Some(idx) = target.find(['/', '?', '#']) {
        target.truncate(idx);
    }
    target
}

/// The orchestrator state: one current run plus a status slot for every
/// task kind. All mutation goes through `update`; the UI layer only reads.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditState {
    url: Option<String>,
    run_id: RunId,
    context_id: Option<String>,
    selected: Vec<TaskKind>,
    is_running: bool,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    last_completed_run_id: Option<RunId>,
    saved_run_id: Option<RunId>,
    statuses: BTreeMap<TaskKind, TaskStatus>,
    dirty: bool,
}

impl Default for AuditState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditState {
    pub fn new() -> Self {
        let statuses = TaskKind::ALL
            .iter()
            .map(|kind| (*kind, TaskStatus::default()))
            .collect();
        Self {
            url: None,
            run_id: 0,
            context_id: None,
            selected: Vec::new(),
            is_running: false,
            started_at: None,
            ended_at: None,
            last_completed_run_id: None,
            saved_run_id: None,
            statuses,
            dirty: false,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn selected(&self) -> &[TaskKind] {
        &self.selected
    }

    pub fn last_completed_run_id(&self) -> Option<RunId> {
        self.last_completed_run_id
    }

    pub fn saved_run_id(&self) -> Option<RunId> {
        self.saved_run_id
    }

    pub fn task_status(&self, kind: TaskKind) -> Option<&TaskStatus> {
        self.statuses.get(&kind)
    }

    /// Whether a task's results tab is eligible for display: the kind is
    /// part of the current run's selection.
    pub fn is_tab_enabled(&self, kind: TaskKind) -> bool {
        self.selected.contains(&kind)
    }

    /// Returns the dirty flag and resets it. The shell renders only when
    /// this reports true, coalescing bursts of messages into one redraw.
    pub fn consume_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    pub fn view(&self) -> AuditViewModel {
        let rows = TaskKind::ALL
            .iter()
            .filter_map(|kind| {
                self.statuses.get(kind).map(|status| TaskRowView {
                    kind: *kind,
                    state: status.state,
                    duration: status.duration,
                    error: status.error.clone(),
                    enabled: self.is_tab_enabled(*kind),
                })
            })
            .collect();

        let mut counts = RunCounts::default();
        for kind in &self.selected {
            if let Some(status) = self.statuses.get(kind) {
                match status.state {
                    TaskState::Pending => counts.pending += 1,
                    TaskState::Running => counts.running += 1,
                    TaskState::Success => counts.succeeded += 1,
                    TaskState::Error => counts.failed += 1,
                    TaskState::Cancelled => counts.cancelled += 1,
                }
            }
        }

        AuditViewModel {
            url: self.url.clone(),
            run_id: self.run_id,
            context_id: self.context_id.clone(),
            is_running: self.is_running,
            started_at: self.started_at,
            ended_at: self.ended_at,
            last_completed_run_id: self.last_completed_run_id,
            rows,
            counts,
            dirty: self.dirty,
        }
    }

    /// Snapshot of the current run, available only once it fully completed
    /// and has not been superseded.
    pub fn completed_run_snapshot(&self) -> Option<RunReport> {
        let run_id = self.last_completed_run_id?;
        if run_id != self.run_id {
            return None;
        }
        let url = self.url.clone()?;
        let started_at = self.started_at?;
        let ended_at = self.ended_at?;
        let tasks = self
            .selected
            .iter()
            .filter_map(|kind| {
                self.statuses.get(kind).map(|status| TaskReport {
                    kind: *kind,
                    state: status.state,
                    duration: status.duration,
                    data: status.data.clone(),
                    error: status.error.clone(),
                })
            })
            .collect();
        Some(RunReport {
            run_id,
            context_id: self.context_id.clone(),
            url,
            started_at,
            ended_at,
            tasks,
        })
    }

    pub(crate) fn begin_run(
        &mut self,
        url: String,
        selected: Vec<TaskKind>,
        context_id: Option<String>,
        at: DateTime<Utc>,
    ) -> RunId {
        // Superseding a run is implicit: bumping the id fences off every
        // event still in flight for the previous one.
        self.run_id += 1;
        self.url = Some(url);
        self.context_id = context_id;
        self.selected = selected;
        self.is_running = true;
        self.started_at = Some(at);
        self.ended_at = None;
        for status in self.statuses.values_mut() {
            *status = TaskStatus::default();
        }
        self.dirty = true;
        self.run_id
    }

    pub(crate) fn apply_task_started(&mut self, run_id: RunId, kind: TaskKind) {
        if !self.accepts_events_for(run_id) || !self.selected.contains(&kind) {
            return;
        }
        if let Some(status) = self.statuses.get_mut(&kind) {
            if status.state == TaskState::Pending {
                status.state = TaskState::Running;
                self.dirty = true;
            }
        }
    }

    /// Applies a terminal outcome for a task. Returns true when this
    /// transition completed the whole run (the join barrier fired).
    pub(crate) fn apply_task_finished(
        &mut self,
        run_id: RunId,
        kind: TaskKind,
        outcome: Result<Value, String>,
        duration: Duration,
        at: DateTime<Utc>,
    ) -> bool {
        if !self.accepts_events_for(run_id) || !self.selected.contains(&kind) {
            return false;
        }
        let Some(status) = self.statuses.get_mut(&kind) else {
            return false;
        };
        if status.state.is_terminal() {
            return false;
        }
        match outcome {
            Ok(data) => {
                status.state = TaskState::Success;
                status.data = Some(data);
            }
            Err(message) => {
                status.state = TaskState::Error;
                status.error = Some(message);
            }
        }
        status.duration = Some(duration);
        self.dirty = true;

        if self.all_selected_terminal() {
            self.is_running = false;
            self.ended_at = Some(at);
            self.last_completed_run_id = Some(run_id);
            return true;
        }
        false
    }

    /// Stop policy: every selected task that has not reached a terminal
    /// state is finalized to `Cancelled`; its duration stays unset. A
    /// stopped run never counts as completed and never persists.
    pub(crate) fn stop_run(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_running {
            return false;
        }
        self.is_running = false;
        if self.ended_at.is_none() {
            self.ended_at = Some(at);
        }
        for kind in &self.selected {
            if let Some(status) = self.statuses.get_mut(kind) {
                if !status.state.is_terminal() {
                    status.state = TaskState::Cancelled;
                }
            }
        }
        self.dirty = true;
        true
    }

    /// Clear policy: a no-op while a run is in flight. The run-id counter
    /// and the saved-run marker survive a clear so ids stay monotonic and
    /// an already-saved run cannot be persisted again.
    pub(crate) fn clear(&mut self) -> bool {
        if self.is_running {
            return false;
        }
        let run_id = self.run_id;
        let saved_run_id = self.saved_run_id;
        *self = Self::new();
        self.run_id = run_id;
        self.saved_run_id = saved_run_id;
        self.dirty = true;
        true
    }

    pub(crate) fn mark_saved(&mut self, run_id: RunId) {
        if self.saved_run_id.is_none_or(|saved| saved < run_id) {
            self.saved_run_id = Some(run_id);
        }
    }

    pub(crate) fn restore_saved_marker(&mut self, run_id: RunId) {
        self.mark_saved(run_id);
        // Keep freshly assigned run ids ahead of the restored marker.
        if self.run_id < run_id {
            self.run_id = run_id;
        }
    }

    pub(crate) fn needs_persist(&self, run_id: RunId) -> bool {
        self.saved_run_id != Some(run_id)
    }

    fn accepts_events_for(&self, run_id: RunId) -> bool {
        self.is_running && run_id == self.run_id
    }

    fn all_selected_terminal(&self) -> bool {
        self.selected.iter().all(|kind| {
            self.statuses
                .get(kind)
                .is_some_and(|status| status.state.is_terminal())
        })
    }
}
