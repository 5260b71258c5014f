use crate::{normalize_target, AuditState, Effect, Msg, TaskKind};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AuditState, msg: Msg) -> (AuditState, Vec<Effect>) {
    let effects = match msg {
        Msg::AuditSubmitted {
            url,
            tasks,
            context_id,
            at,
        } => {
            let target = normalize_target(&url);
            if target.is_empty() || tasks.is_empty() {
                return (state, Vec::new());
            }
            let kinds = dedupe_kinds(tasks);
            let run_id = state.begin_run(target.clone(), kinds.clone(), context_id, at);
            vec![Effect::StartRun {
                run_id,
                url: target,
                kinds,
            }]
        }
        Msg::TaskStarted { run_id, kind } => {
            state.apply_task_started(run_id, kind);
            Vec::new()
        }
        Msg::TaskFinished {
            run_id,
            kind,
            outcome,
            duration,
            at,
        } => {
            let run_completed = state.apply_task_finished(run_id, kind, outcome, duration, at);
            if run_completed && state.needs_persist(run_id) {
                vec![Effect::PersistRun { run_id }]
            } else {
                Vec::new()
            }
        }
        Msg::StopClicked { at } => {
            if state.stop_run(at) {
                vec![Effect::StopRun {
                    run_id: state.run_id(),
                }]
            } else {
                Vec::new()
            }
        }
        Msg::ClearClicked => {
            state.clear();
            Vec::new()
        }
        Msg::RunSaved { run_id } => {
            state.mark_saved(run_id);
            Vec::new()
        }
        Msg::RestoreSavedMarker { run_id } => {
            state.restore_saved_marker(run_id);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn dedupe_kinds(kinds: Vec<TaskKind>) -> Vec<TaskKind> {
    let mut deduped = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !deduped.contains(&kind) {
            deduped.push(kind);
        }
    }
    deduped
}
