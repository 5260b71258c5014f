use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use audit_core::{update, AuditState, AuditViewModel, Msg, TaskKind, TaskState};
use audit_engine::EngineConfig;
use audit_logging::audit_info;
use chrono::Utc;

use crate::effects::EffectRunner;
use crate::logging::{self, LogDestination};

const MARKER_FILENAME: &str = ".audit_saved_run.ron";
const SAVE_ENDPOINT: &str = "http://localhost:4000/api/audits";

pub struct AppOptions {
    pub url: String,
    pub tasks: Vec<TaskKind>,
    pub context_id: Option<String>,
}

pub fn run_app(options: AppOptions) -> anyhow::Result<()> {
    logging::initialize(LogDestination::File);

    let marker_path = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(MARKER_FILENAME);
    let mut runner = EffectRunner::new(
        EngineConfig::default(),
        marker_path,
        SAVE_ENDPOINT.to_string(),
    );

    let mut state = AuditState::new();
    if let Some(run_id) = runner.saved_run_id() {
        let (next, _effects) = update(state, Msg::RestoreSavedMarker { run_id });
        state = next;
    }

    state = dispatch(
        &mut runner,
        state,
        Msg::AuditSubmitted {
            url: options.url,
            tasks: options.tasks,
            context_id: options.context_id,
            at: Utc::now(),
        },
    );
    if !state.is_running() {
        anyhow::bail!("nothing to audit: empty target or task selection");
    }
    if state.consume_dirty() {
        print!("{}", render_summary(&state.view()));
    }

    // Event loop: drain engine events, apply them, render on dirty.
    loop {
        let msgs = runner.poll_events();
        if msgs.is_empty() {
            std::thread::sleep(Duration::from_millis(20));
        }
        for msg in msgs {
            state = dispatch(&mut runner, state, msg);
        }
        let (next, _effects) = update(state, Msg::Tick);
        state = next;
        if state.consume_dirty() {
            print!("{}", render_summary(&state.view()));
        }
        if !state.is_running() {
            break;
        }
    }

    runner.shutdown();
    audit_info!("Audit run {} finished", state.run_id());
    Ok(())
}

fn dispatch(runner: &mut EffectRunner, state: AuditState, msg: Msg) -> AuditState {
    let (mut state, effects) = update(state, msg);
    for follow_up in runner.run(effects, &state) {
        let (next, _effects) = update(state, follow_up);
        state = next;
    }
    state
}

fn render_summary(view: &AuditViewModel) -> String {
    let mut out = String::new();
    let url = view.url.as_deref().unwrap_or("-");
    let _ = writeln!(
        out,
        "Audit #{} {} ({} running, {} ok, {} failed, {} cancelled)",
        view.run_id,
        url,
        view.counts.running,
        view.counts.succeeded,
        view.counts.failed,
        view.counts.cancelled
    );
    for row in view.rows.iter().filter(|row| row.enabled) {
        let duration = row
            .duration
            .map(|duration| format!("{}ms", duration.as_millis()))
            .unwrap_or_else(|| "-".to_string());
        let detail = row.error.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "  {:<12} {:<9} {:>8} {}",
            row.kind.to_string(),
            state_label(row.state),
            duration,
            detail
        );
    }
    out
}

fn state_label(state: TaskState) -> &'static str {
    match state {
        TaskState::Pending => "pending",
        TaskState::Running => "running",
        TaskState::Success => "success",
        TaskState::Error => "error",
        TaskState::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::render_summary;
    use audit_core::{update, AuditState, Msg, TaskKind};
    use chrono::{TimeZone, Utc};

    #[test]
    fn summary_lists_only_selected_tasks() {
        let at = Utc.timestamp_opt(0, 0).unwrap();
        let (state, _effects) = update(
            AuditState::new(),
            Msg::AuditSubmitted {
                url: "example.com".to_string(),
                tasks: vec![TaskKind::Ssl, TaskKind::Dns],
                context_id: None,
                at,
            },
        );
        let (state, _effects) = update(
            state,
            Msg::TaskFinished {
                run_id: 1,
                kind: TaskKind::Ssl,
                outcome: Err("handshake failed".to_string()),
                duration: std::time::Duration::from_millis(80),
                at,
            },
        );

        let summary = render_summary(&state.view());
        assert!(summary.contains("Audit #1 example.com"));
        assert!(summary.contains("ssl"));
        assert!(summary.contains("handshake failed"));
        assert!(summary.contains("dns"));
        assert!(!summary.contains("typography"));
    }
}
