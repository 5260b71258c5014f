use std::path::PathBuf;
use std::sync::Arc;

use audit_core::{AuditState, Effect, Msg, RunReport, TaskState};
use audit_engine::{
    EngineConfig, EngineEvent, EngineHandle, HttpResultSink, MarkerStore, RunRecord, SaveOutbox,
    TaskRecord,
};
use audit_logging::{audit_info, audit_warn};
use chrono::Utc;

pub struct EffectRunner {
    engine: EngineHandle,
    outbox: SaveOutbox,
}

impl EffectRunner {
    pub fn new(config: EngineConfig, marker_path: PathBuf, save_endpoint: String) -> Self {
        let engine = EngineHandle::new(config);
        let sink = Arc::new(HttpResultSink::new(save_endpoint));
        let outbox = SaveOutbox::new(MarkerStore::new(marker_path), sink);
        Self { engine, outbox }
    }

    pub fn saved_run_id(&self) -> Option<u64> {
        self.outbox.saved_run_id()
    }

    /// Execute effects against the engine and outbox. Returns follow-up
    /// messages to feed back into the state machine.
    pub fn run(&mut self, effects: Vec<Effect>, state: &AuditState) -> Vec<Msg> {
        let mut follow_ups = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartRun { run_id, url, kinds } => {
                    audit_info!(
                        "StartRun run_id={} url={} tasks={}",
                        run_id,
                        url,
                        kinds.len()
                    );
                    let kinds = kinds.iter().map(|kind| map_kind(*kind)).collect();
                    self.engine.start_run(run_id, url, kinds);
                }
                Effect::StopRun { run_id } => {
                    audit_info!("StopRun run_id={}", run_id);
                    self.engine.stop_run(run_id);
                }
                Effect::PersistRun { run_id } => match state.completed_run_snapshot() {
                    Some(report) if report.run_id == run_id => {
                        if self.outbox.trigger(build_record(&report)) {
                            follow_ups.push(Msg::RunSaved { run_id });
                        }
                    }
                    _ => {
                        audit_warn!("PersistRun for run {} without a completed snapshot", run_id);
                    }
                },
            }
        }
        follow_ups
    }

    /// Drain engine events into state-machine messages.
    pub fn poll_events(&self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            match event {
                EngineEvent::TaskStarted { run_id, kind } => {
                    msgs.push(Msg::TaskStarted {
                        run_id,
                        kind: map_kind_back(kind),
                    });
                }
                EngineEvent::TaskFinished {
                    run_id,
                    kind,
                    result,
                    elapsed,
                } => {
                    let outcome = match result {
                        Ok(report) => Ok(report.payload),
                        Err(err) => {
                            audit_warn!("Task {} failed for run {}: {}", kind, run_id, err);
                            Err(err.to_string())
                        }
                    };
                    msgs.push(Msg::TaskFinished {
                        run_id,
                        kind: map_kind_back(kind),
                        outcome,
                        duration: elapsed,
                        at: Utc::now(),
                    });
                }
            }
        }
        msgs
    }

    /// Drain the in-flight background save before process exit.
    pub fn shutdown(&mut self) {
        self.outbox.join_inflight();
    }
}

fn map_kind(kind: audit_core::TaskKind) -> audit_engine::TaskKind {
    match kind {
        audit_core::TaskKind::Performance => audit_engine::TaskKind::Performance,
        audit_core::TaskKind::Monitor => audit_engine::TaskKind::Monitor,
        audit_core::TaskKind::Ssl => audit_engine::TaskKind::Ssl,
        audit_core::TaskKind::Dns => audit_engine::TaskKind::Dns,
        audit_core::TaskKind::Sitemap => audit_engine::TaskKind::Sitemap,
        audit_core::TaskKind::Api => audit_engine::TaskKind::Api,
        audit_core::TaskKind::Links => audit_engine::TaskKind::Links,
        audit_core::TaskKind::Typography => audit_engine::TaskKind::Typography,
    }
}

fn map_kind_back(kind: audit_engine::TaskKind) -> audit_core::TaskKind {
    match kind {
        audit_engine::TaskKind::Performance => audit_core::TaskKind::Performance,
        audit_engine::TaskKind::Monitor => audit_core::TaskKind::Monitor,
        audit_engine::TaskKind::Ssl => audit_core::TaskKind::Ssl,
        audit_engine::TaskKind::Dns => audit_core::TaskKind::Dns,
        audit_engine::TaskKind::Sitemap => audit_core::TaskKind::Sitemap,
        audit_engine::TaskKind::Api => audit_core::TaskKind::Api,
        audit_engine::TaskKind::Links => audit_core::TaskKind::Links,
        audit_engine::TaskKind::Typography => audit_core::TaskKind::Typography,
    }
}

fn build_record(report: &RunReport) -> RunRecord {
    RunRecord {
        run_id: report.run_id,
        context_id: report.context_id.clone(),
        url: report.url.clone(),
        started_at: report.started_at.to_rfc3339(),
        ended_at: report.ended_at.to_rfc3339(),
        tasks: report
            .tasks
            .iter()
            .map(|task| TaskRecord {
                kind: task.kind.as_str().to_string(),
                outcome: outcome_label(task.state).to_string(),
                duration_ms: task.duration.map(|duration| duration.as_millis() as u64),
                data: task.data.clone(),
                error: task.error.clone(),
            })
            .collect(),
    }
}

fn outcome_label(state: TaskState) -> &'static str {
    match state {
        TaskState::Pending => "pending",
        TaskState::Running => "running",
        TaskState::Success => "success",
        TaskState::Error => "error",
        TaskState::Cancelled => "cancelled",
    }
}
