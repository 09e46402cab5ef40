use async_trait::async_trait;
use tracing::debug;

use super::{outcome, sequence_dn, Counters, Session, Workload};
use crate::config::{ModifyParams, OperationKind, RunConfig};
use crate::error::Result;

/// Replaces one attribute on `cn={worker}-{sequence}` entries
pub struct ModifyWorkload {
    session: Session,
    counters: Counters,
    params: ModifyParams,
    base_dn: String,
}

impl ModifyWorkload {
    pub fn new(session: Session, params: ModifyParams) -> Self {
        Self {
            session,
            counters: Counters::default(),
            params,
            base_dn: String::new(),
        }
    }
}

#[async_trait]
impl Workload for ModifyWorkload {
    workload_accessors!(OperationKind::Modify);

    async fn prepare(&mut self, config: &RunConfig) -> Result<()> {
        debug!(
            worker_id = self.session.worker_id(),
            attr = %self.params.attr,
            value = %self.params.value,
            "prepare"
        );
        self.base_dn = config.base_dn.clone();
        self.session.bind(config).await
    }

    async fn request(&mut self) -> bool {
        let worker_id = self.session.worker_id();
        let dn = sequence_dn(worker_id, self.counters.total, &self.base_dn);
        let result = match self.session.client() {
            Ok(client) => {
                client
                    .modify(&dn, &self.params.attr, &self.params.value)
                    .await
            }
            Err(e) => Err(e),
        };
        outcome(worker_id, OperationKind::Modify, result)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::config::{AddParams, ModifyParams, WorkloadParams};

    #[tokio::test]
    async fn test_modify_replaces_attribute() {
        let dir = directory();
        let mut adder = ready(&dir, &config(WorkloadParams::Add(AddParams::default())), 0).await;
        drive(&mut adder, 2).await;

        let params = ModifyParams {
            attr: "description".to_string(),
            value: "benchmarked".to_string(),
        };
        let mut modifier = ready(&dir, &config(WorkloadParams::Modify(params)), 0).await;
        drive(&mut modifier, 3).await;

        assert_eq!(modifier.counters().total, 3);
        assert_eq!(modifier.counters().success, 2);
        let entry = dir.get("cn=0-1,dc=example,dc=com").unwrap();
        assert_eq!(entry.attrs["description"], vec!["benchmarked".to_string()]);
    }
}
