use crate::{RunId, TaskKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Launch the selected analyzers for a freshly created run.
    StartRun {
        run_id: RunId,
        url: String,
        kinds: Vec<TaskKind>,
    },
    /// Stop launching work for the given run; in-flight requests are left
    /// to finish and their late results are discarded by id fencing.
    StopRun { run_id: RunId },
    /// Hand the completed run to the persistence outbox. Emitted at most
    /// once per run id.
    PersistRun { run_id: RunId },
}
