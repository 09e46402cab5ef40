use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{outcome, Counters, Session, Workload};
use crate::config::{AddParams, OperationKind, RunConfig};
use crate::directory::Attribute;
use crate::error::Result;

/// Adds one `person` entry per request
pub struct AddWorkload {
    session: Session,
    counters: Counters,
    params: AddParams,
    base_dn: String,
}

impl AddWorkload {
    pub fn new(session: Session, params: AddParams) -> Self {
        Self {
            session,
            counters: Counters::default(),
            params,
            base_dn: String::new(),
        }
    }

    fn next_cn(&self) -> String {
        if self.params.uuid {
            Uuid::new_v4().to_string()
        } else {
            format!("{}-{}", self.session.worker_id(), self.counters.total)
        }
    }
}

#[async_trait]
impl Workload for AddWorkload {
    workload_accessors!(OperationKind::Add);

    async fn prepare(&mut self, config: &RunConfig) -> Result<()> {
        debug!(worker_id = self.session.worker_id(), "prepare");
        self.base_dn = config.base_dn.clone();
        self.session.bind(config).await
    }

    async fn request(&mut self) -> bool {
        let cn = self.next_cn();
        let dn = format!("cn={},{}", cn, self.base_dn);
        let worker_id = self.session.worker_id();
        let sn = worker_id.to_string();
        let attrs = vec![
            Attribute::new("objectClass", &["person"]),
            Attribute::new("cn", &[cn.as_str()]),
            Attribute::new("sn", &[sn.as_str()]),
            Attribute::new("userPassword", &["secret"]),
        ];

        let result = match self.session.client() {
            Ok(client) => client.add(&dn, attrs).await,
            Err(e) => Err(e),
        };
        outcome(worker_id, OperationKind::Add, result)
    }
}
