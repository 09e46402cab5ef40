use async_trait::async_trait;
use tracing::{debug, warn};

use super::{outcome, Counters, Session, Workload};
use crate::config::{OperationKind, RunConfig};
use crate::error::Result;
use crate::template::{Template, TemplateGenerator};

/// Re-binds on every request, optionally as a random user from a DN template
pub struct BindWorkload {
    session: Session,
    counters: Counters,
    dns: Option<TemplateGenerator>,
    password: String,
}

impl BindWorkload {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            counters: Counters::default(),
            dns: None,
            password: String::new(),
        }
    }
}

#[async_trait]
impl Workload for BindWorkload {
    workload_accessors!(OperationKind::Bind);

    async fn prepare(&mut self, config: &RunConfig) -> Result<()> {
        let worker_id = self.session.worker_id();
        let template = Template::parse(&config.bind_dn)?;
        let range = config.id_range();
        if template.is_parameterized() && range.is_none() {
            warn!(worker_id, dn = %config.bind_dn, "bind DN has a placeholder but no id range; binding literally");
        }
        debug!(worker_id, ?range, "prepare");

        self.dns = Some(TemplateGenerator::new(template, range));
        self.password = config.bind_password.clone();
        Ok(())
    }

    async fn request(&mut self) -> bool {
        let worker_id = self.session.worker_id();
        let dn = match self.dns.as_mut() {
            Some(dns) => dns.next_value(),
            None => return false,
        };

        let result = match self.session.client() {
            Ok(client) => client.bind(&dn, &self.password).await,
            Err(e) => Err(e),
        };
        outcome(worker_id, OperationKind::Bind, result)
    }
}
