//! Benchmark orchestrator - spawns workers and runs the start barrier
//!
//! The handshake has two phases. Every worker connects and prepares, then
//! reports readiness; only after all readiness signals have been observed
//! does the orchestrator hand out start tokens. The measured window therefore
//! covers the request loops alone, never the uneven cost of connecting.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::directory::DirectoryConnector;
use crate::error::{BenchError, Result};
use crate::worker::{Readiness, StartToken, Worker, WorkerResult};
use crate::workload::{build_workload, Workload};

/// Orchestrator states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Spawning,
    AwaitingReady,
    Running,
    Collecting,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Spawning => "spawning",
            Phase::AwaitingReady => "awaiting_ready",
            Phase::Running => "running",
            Phase::Collecting => "collecting",
            Phase::Done => "done",
        }
    }
}

/// Drives one benchmark run from spawn to result collection
pub struct Orchestrator {
    config: Arc<RunConfig>,
    phase: Phase,
    ready_count: usize,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config: Arc::new(config),
            phase: Phase::Spawning,
            ready_count: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Readiness signals observed so far
    pub fn ready_count(&self) -> usize {
        self.ready_count
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run with workloads built from the configured parameters
    pub async fn run(&mut self, connector: Arc<dyn DirectoryConnector>) -> Result<Vec<WorkerResult>> {
        let config = Arc::clone(&self.config);
        self.run_with(move |_| build_workload(&config, Arc::clone(&connector)))
            .await
    }

    /// Run with workloads produced by `factory`, called once per worker id
    pub async fn run_with<F>(&mut self, mut factory: F) -> Result<Vec<WorkerResult>>
    where
        F: FnMut(usize) -> Box<dyn Workload>,
    {
        let worker_count = self.config.concurrency;
        let iterations = self.config.iterations_per_worker();

        self.transition(Phase::Spawning);
        let (ready_tx, mut ready_rx) = mpsc::channel::<Readiness>(1);
        let (result_tx, mut result_rx) = mpsc::channel::<WorkerResult>(1);
        let mut start_txs = Vec::with_capacity(worker_count);
        let mut workers = JoinSet::new();

        for worker_id in 0..worker_count {
            let (start_tx, start_rx) = oneshot::channel::<StartToken>();
            start_txs.push(start_tx);

            let worker = Worker::new(worker_id, factory(worker_id), Arc::clone(&self.config), iterations);
            workers.spawn(worker.run(ready_tx.clone(), start_rx, result_tx.clone()));
        }
        drop(ready_tx);
        drop(result_tx);
        info!(workers = worker_count, iterations, "spawned workers");

        self.transition(Phase::AwaitingReady);
        while self.ready_count < worker_count {
            let Some(readiness) = ready_rx.recv().await else {
                return Err(BenchError::WorkerLost(format!(
                    "only {} of {} workers reported readiness",
                    self.ready_count, worker_count
                )));
            };
            if let Err(e) = readiness.outcome {
                error!(worker_id = readiness.worker_id, error = %e, "setup failed, aborting run");
                // Dropping the start senders releases every waiting worker;
                // dropping the readiness receiver releases those still in setup.
                drop(start_txs);
                drop(ready_rx);
                while let Some(joined) = workers.join_next().await {
                    if let Err(join_err) = joined {
                        debug!(error = %join_err, "worker task failed during abort");
                    }
                }
                return Err(e);
            }
            self.ready_count += 1;
            debug!(worker_id = readiness.worker_id, ready = self.ready_count, "worker ready");
        }

        self.transition(Phase::Running);
        for start_tx in start_txs {
            start_tx
                .send(StartToken)
                .map_err(|_| BenchError::WorkerLost("worker exited before start".to_string()))?;
        }

        self.transition(Phase::Collecting);
        let mut slots: Vec<Option<WorkerResult>> = (0..worker_count).map(|_| None).collect();
        for _ in 0..worker_count {
            let result = result_rx.recv().await.ok_or_else(|| {
                BenchError::WorkerLost("a worker exited without reporting a result".to_string())
            })?;
            let worker_id = result.worker_id;
            let Some(slot) = slots.get_mut(worker_id) else {
                return Err(BenchError::WorkerLost(format!(
                    "result from unknown worker[{}]",
                    worker_id
                )));
            };
            if slot.is_some() {
                return Err(BenchError::DuplicateResult(worker_id));
            }
            *slot = Some(result);
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| BenchError::WorkerLost(e.to_string()))?;
        }

        self.transition(Phase::Done);
        let results = slots.into_iter().flatten().collect();
        Ok(results)
    }

    fn transition(&mut self, phase: Phase) {
        debug!(from = self.phase.as_str(), to = phase.as_str(), "orchestrator phase");
        self.phase = phase;
    }
}
