//! Worker lifecycle
//!
//! connect → prepare → signal readiness → await start token → timed loop →
//! finish → send result. Each worker owns its workload and connection; the
//! only shared state is the handshake channels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::Result;
use crate::latency::LatencyHistogram;
use crate::workload::Workload;

/// Readiness signal sent once per worker after setup
#[derive(Debug)]
pub struct Readiness {
    pub worker_id: usize,
    /// `Err` carries a setup failure that aborts the run
    pub outcome: Result<()>,
}

/// Permission to enter the timed loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartToken;

/// Outcome of one worker, immutable once sent
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub worker_id: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub start_time: Instant,
    pub end_time: Instant,
    pub latency: LatencyHistogram,
}

impl WorkerResult {
    pub fn elapsed(&self) -> Duration {
        self.end_time.saturating_duration_since(self.start_time)
    }

    /// Requests per second over this worker's own window
    pub fn throughput(&self) -> Option<f64> {
        let secs = self.elapsed().as_secs_f64();
        (secs > 0.0).then(|| self.total_requests as f64 / secs)
    }
}

/// One concurrent execution lane
pub struct Worker {
    id: usize,
    workload: Box<dyn Workload>,
    config: Arc<RunConfig>,
    iterations: u64,
}

impl Worker {
    pub fn new(
        id: usize,
        workload: Box<dyn Workload>,
        config: Arc<RunConfig>,
        iterations: u64,
    ) -> Self {
        Self {
            id,
            workload,
            config,
            iterations,
        }
    }

    /// Run the full lifecycle, reporting through the handshake channels
    pub async fn run(
        mut self,
        ready_tx: mpsc::Sender<Readiness>,
        start_rx: oneshot::Receiver<StartToken>,
        result_tx: mpsc::Sender<WorkerResult>,
    ) {
        let outcome = self.setup().await;
        let failed = outcome.is_err();

        let delivered = ready_tx
            .send(Readiness {
                worker_id: self.id,
                outcome,
            })
            .await
            .is_ok();
        drop(ready_tx);

        if failed || !delivered {
            self.workload.finish().await;
            return;
        }

        if start_rx.await.is_err() {
            debug!(worker_id = self.id, "run aborted before start");
            self.workload.finish().await;
            return;
        }

        let result = self.execute().await;
        if result_tx.send(result).await.is_err() {
            debug!(worker_id = self.id, "result receiver dropped");
        }
    }

    async fn setup(&mut self) -> Result<()> {
        self.workload.connect(self.id, &self.config).await?;
        self.workload.prepare(&self.config).await?;
        debug!(worker_id = self.id, "ready");
        Ok(())
    }

    /// Timed loop followed by finish
    async fn execute(&mut self) -> WorkerResult {
        debug!(worker_id = self.id, iterations = self.iterations, "starting job");
        let mut latency = LatencyHistogram::new();

        let start_time = Instant::now();
        for _ in 0..self.iterations {
            let issued = Instant::now();
            let ok = self.workload.request().await;
            latency.record(issued.elapsed());
            self.workload.counters_mut().record(ok);
        }
        let end_time = Instant::now();

        self.workload.finish().await;

        let counters = self.workload.counters();
        let result = WorkerResult {
            worker_id: self.id,
            total_requests: counters.total,
            successful_requests: counters.success,
            start_time,
            end_time,
            latency,
        };
        info!(
            worker_id = self.id,
            requests = result.total_requests,
            success = result.successful_requests,
            elapsed_ms = result.elapsed().as_millis() as u64,
            "worker finished"
        );
        result
    }
}
