use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::analyzer::{Analyzer, HttpAnalyzer};
use crate::{AnalyzerSettings, EngineEvent, RunId, TaskKind};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub analyzer: AnalyzerSettings,
    /// Upper bound on analyzer calls in flight at once.
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerSettings::default(),
            max_concurrent: 4,
        }
    }
}

enum EngineCommand {
    StartRun {
        run_id: RunId,
        url: String,
        kinds: Vec<TaskKind>,
    },
    StopRun {
        run_id: RunId,
    },
}

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let analyzers = TaskKind::ALL
            .iter()
            .map(|kind| {
                let analyzer: Arc<dyn Analyzer> =
                    Arc::new(HttpAnalyzer::new(*kind, config.analyzer.clone()));
                (*kind, analyzer)
            })
            .collect();
        Self::with_analyzers(config, analyzers)
    }

    /// Engine over a caller-provided analyzer set; used by tests.
    pub fn with_analyzers(
        config: EngineConfig,
        analyzers: HashMap<TaskKind, Arc<dyn Analyzer>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let max_concurrent = config.max_concurrent.max(1);
        let active_run = Arc::new(AtomicU64::new(0));

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartRun { run_id, url, kinds } => {
                        active_run.store(run_id, Ordering::SeqCst);
                        let semaphore = Arc::new(Semaphore::new(max_concurrent));
                        for kind in kinds {
                            let Some(analyzer) = analyzers.get(&kind).cloned() else {
                                continue;
                            };
                            let url = url.clone();
                            let semaphore = semaphore.clone();
                            let active_run = active_run.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                run_task(
                                    run_id, kind, url, analyzer, semaphore, active_run, event_tx,
                                )
                                .await;
                            });
                        }
                    }
                    EngineCommand::StopRun { run_id } => {
                        // Cooperative stop: tasks still queued behind the
                        // semaphore observe the cleared id and bail before
                        // issuing a request. In-flight requests finish on
                        // their own; their results are fenced downstream.
                        let _ = active_run.compare_exchange(
                            run_id,
                            0,
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        );
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start_run(&self, run_id: RunId, url: impl Into<String>, kinds: Vec<TaskKind>) {
        let _ = self.cmd_tx.send(EngineCommand::StartRun {
            run_id,
            url: url.into(),
            kinds,
        });
    }

    pub fn stop_run(&self, run_id: RunId) {
        let _ = self.cmd_tx.send(EngineCommand::StopRun { run_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn run_task(
    run_id: RunId,
    kind: TaskKind,
    url: String,
    analyzer: Arc<dyn Analyzer>,
    semaphore: Arc<Semaphore>,
    active_run: Arc<AtomicU64>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let Ok(_permit) = semaphore.acquire().await else {
        return;
    };
    if active_run.load(Ordering::SeqCst) != run_id {
        return;
    }
    let _ = event_tx.send(EngineEvent::TaskStarted { run_id, kind });
    let started = Instant::now();
    let result = analyzer.analyze(&url).await;
    let _ = event_tx.send(EngineEvent::TaskFinished {
        run_id,
        kind,
        result,
        elapsed: started.elapsed(),
    });
}
