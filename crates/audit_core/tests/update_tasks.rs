use std::sync::Once;
use std::time::Duration;

use audit_core::{update, AuditState, Effect, Msg, TaskKind, TaskState};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(audit_logging::initialize_for_tests);
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn submit(state: AuditState, url: &str, kinds: &[TaskKind]) -> (AuditState, Vec<Effect>) {
    update(
        state,
        Msg::AuditSubmitted {
            url: url.to_string(),
            tasks: kinds.to_vec(),
            context_id: None,
            at: at(0),
        },
    )
}

fn finish(
    state: AuditState,
    run_id: u64,
    kind: TaskKind,
    outcome: Result<serde_json::Value, String>,
    secs: i64,
) -> (AuditState, Vec<Effect>) {
    update(
        state,
        Msg::TaskFinished {
            run_id,
            kind,
            outcome,
            duration: Duration::from_millis(250),
            at: at(secs),
        },
    )
}

#[test]
fn task_started_moves_pending_to_running() {
    init_logging();
    let state = AuditState::new();
    let (state, _effects) = submit(state, "example.com", &[TaskKind::Performance]);

    let (mut state, effects) = update(
        state,
        Msg::TaskStarted {
            run_id: 1,
            kind: TaskKind::Performance,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(
        state.task_status(TaskKind::Performance).unwrap().state,
        TaskState::Running
    );
    assert_eq!(state.view().counts.running, 1);
    assert!(state.consume_dirty());
}

#[test]
fn started_event_for_unselected_kind_is_ignored() {
    init_logging();
    let state = AuditState::new();
    let (state, _effects) = submit(state, "example.com", &[TaskKind::Ssl]);

    let (next, _effects) = update(
        state.clone(),
        Msg::TaskStarted {
            run_id: 1,
            kind: TaskKind::Typography,
        },
    );

    assert_eq!(next, state);
    assert_eq!(
        next.task_status(TaskKind::Typography).unwrap().state,
        TaskState::Pending
    );
}

#[test]
fn success_records_payload_and_duration() {
    init_logging();
    let state = AuditState::new();
    let (state, _effects) = submit(state, "example.com", &[TaskKind::Ssl, TaskKind::Dns]);

    let payload = json!({"issuer": "Let's Encrypt", "days_left": 42});
    let (state, effects) = finish(state, 1, TaskKind::Ssl, Ok(payload.clone()), 1);

    // Only one of two tasks is terminal; the run must not finalize yet.
    assert!(effects.is_empty());
    assert!(state.is_running());
    let status = state.task_status(TaskKind::Ssl).unwrap();
    assert_eq!(status.state, TaskState::Success);
    assert_eq!(status.data.as_ref(), Some(&payload));
    assert_eq!(status.duration, Some(Duration::from_millis(250)));
    assert_eq!(status.error, None);
}

#[test]
fn failure_is_isolated_and_run_still_completes() {
    init_logging();
    let state = AuditState::new();
    let (state, _effects) = submit(state, "example.com", &[TaskKind::Ssl, TaskKind::Dns]);

    let (state, effects) = finish(state, 1, TaskKind::Ssl, Ok(json!({"grade": "A"})), 1);
    assert!(effects.is_empty());

    let (state, effects) = finish(
        state,
        1,
        TaskKind::Dns,
        Err("lookup timed out".to_string()),
        2,
    );

    // The barrier fires once every selected task is terminal, regardless
    // of the mix of outcomes.
    assert_eq!(effects, vec![Effect::PersistRun { run_id: 1 }]);
    let view = state.view();
    assert!(!view.is_running);
    assert_eq!(view.ended_at, Some(at(2)));
    assert_eq!(view.last_completed_run_id, Some(1));
    assert_eq!(view.counts.succeeded, 1);
    assert_eq!(view.counts.failed, 1);

    let dns = state.task_status(TaskKind::Dns).unwrap();
    assert_eq!(dns.state, TaskState::Error);
    assert_eq!(dns.error.as_deref(), Some("lookup timed out"));
    assert_eq!(dns.data, None);
}

#[test]
fn unselected_tasks_stay_pending_after_completion() {
    init_logging();
    let state = AuditState::new();
    let (state, _effects) = submit(state, "example.com", &[TaskKind::Links]);
    let (state, _effects) = finish(state, 1, TaskKind::Links, Ok(json!({"broken": 0})), 1);

    for kind in TaskKind::ALL {
        let expected = if kind == TaskKind::Links {
            TaskState::Success
        } else {
            TaskState::Pending
        };
        assert_eq!(state.task_status(kind).unwrap().state, expected);
    }
}

#[test]
fn terminal_task_does_not_transition_again() {
    init_logging();
    let state = AuditState::new();
    let (state, _effects) = submit(state, "example.com", &[TaskKind::Ssl, TaskKind::Dns]);
    let (state, _effects) = finish(state, 1, TaskKind::Ssl, Ok(json!({"grade": "A"})), 1);

    // A duplicate terminal event for the same task must not overwrite it.
    let (state, effects) = finish(
        state,
        1,
        TaskKind::Ssl,
        Err("late duplicate".to_string()),
        2,
    );

    assert!(effects.is_empty());
    let status = state.task_status(TaskKind::Ssl).unwrap();
    assert_eq!(status.state, TaskState::Success);
    assert_eq!(status.error, None);
}

#[test]
fn counts_track_the_full_selection() {
    init_logging();
    let state = AuditState::new();
    let (state, _effects) = submit(
        state,
        "example.com",
        &[TaskKind::Ssl, TaskKind::Dns, TaskKind::Sitemap, TaskKind::Api],
    );
    let (state, _effects) = update(
        state,
        Msg::TaskStarted {
            run_id: 1,
            kind: TaskKind::Ssl,
        },
    );
    let (state, _effects) = finish(state, 1, TaskKind::Dns, Ok(json!({})), 1);
    let (state, _effects) = finish(state, 1, TaskKind::Sitemap, Err("404".to_string()), 1);

    let counts = state.view().counts;
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.running, 1);
    assert_eq!(counts.succeeded, 1);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.cancelled, 0);
}
