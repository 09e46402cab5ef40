//! Connectivity smoke test: connect, then sleep instead of issuing operations

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use super::{Counters, Session, Workload};
use crate::config::{NoopParams, OperationKind, RunConfig};
use crate::error::Result;

pub struct NoopWorkload {
    session: Session,
    counters: Counters,
    delay: Duration,
}

impl NoopWorkload {
    pub fn new(session: Session, params: NoopParams) -> Self {
        Self {
            session,
            counters: Counters::default(),
            delay: Duration::from_millis(params.delay_ms),
        }
    }
}

#[async_trait]
impl Workload for NoopWorkload {
    workload_accessors!(OperationKind::Noop);

    async fn prepare(&mut self, _config: &RunConfig) -> Result<()> {
        Ok(())
    }

    async fn request(&mut self) -> bool {
        trace!(worker_id = self.session.worker_id(), sequence = self.counters.total, "noop request");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        true
    }
}
