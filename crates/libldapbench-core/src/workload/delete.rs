use async_trait::async_trait;
use tracing::debug;

use super::{outcome, sequence_dn, Counters, Session, Workload};
use crate::config::{OperationKind, RunConfig};
use crate::error::Result;

/// Deletes `cn={worker}-{sequence}` entries, typically left by an add run
pub struct DeleteWorkload {
    session: Session,
    counters: Counters,
    base_dn: String,
}

impl DeleteWorkload {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            counters: Counters::default(),
            base_dn: String::new(),
        }
    }
}

#[async_trait]
impl Workload for DeleteWorkload {
    workload_accessors!(OperationKind::Delete);

    async fn prepare(&mut self, config: &RunConfig) -> Result<()> {
        debug!(worker_id = self.session.worker_id(), "prepare");
        self.base_dn = config.base_dn.clone();
        self.session.bind(config).await
    }

    async fn request(&mut self) -> bool {
        let worker_id = self.session.worker_id();
        let dn = sequence_dn(worker_id, self.counters.total, &self.base_dn);
        let result = match self.session.client() {
            Ok(client) => client.delete(&dn).await,
            Err(e) => Err(e),
        };
        outcome(worker_id, OperationKind::Delete, result)
    }
}
