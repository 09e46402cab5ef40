use async_trait::async_trait;
use tracing::debug;

use super::{outcome, sequence_dn, Counters, Session, Workload};
use crate::config::{OperationKind, PassmodParams, RunConfig};
use crate::error::Result;

/// Password modify extended operation on `cn={worker}-{sequence}` entries
pub struct PasswordModifyWorkload {
    session: Session,
    counters: Counters,
    params: PassmodParams,
    base_dn: String,
    old_password: String,
}

impl PasswordModifyWorkload {
    pub fn new(session: Session, params: PassmodParams) -> Self {
        Self {
            session,
            counters: Counters::default(),
            params,
            base_dn: String::new(),
            old_password: String::new(),
        }
    }
}

#[async_trait]
impl Workload for PasswordModifyWorkload {
    workload_accessors!(OperationKind::Passmod);

    async fn prepare(&mut self, config: &RunConfig) -> Result<()> {
        debug!(worker_id = self.session.worker_id(), "prepare");
        self.base_dn = config.base_dn.clone();
        self.old_password = self
            .params
            .old_password
            .clone()
            .unwrap_or_else(|| config.bind_password.clone());
        self.session.bind(config).await
    }

    async fn request(&mut self) -> bool {
        let worker_id = self.session.worker_id();
        let dn = sequence_dn(worker_id, self.counters.total, &self.base_dn);
        let result = match self.session.client() {
            Ok(client) => {
                client
                    .password_modify(&dn, Some(&self.old_password), &self.params.new_password)
                    .await
            }
            Err(e) => Err(e),
        };
        outcome(worker_id, OperationKind::Passmod, result)
    }
}
