use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Counters, Session, Workload};
use crate::config::{OperationKind, RunConfig, SearchParams, WorkloadParams};
use crate::directory::SearchScope;
use crate::error::{BenchError, Result};
use crate::template::{Template, TemplateGenerator};

/// Searches with a (possibly templated) filter; success needs at least one entry
pub struct SearchWorkload {
    session: Session,
    counters: Counters,
    base_dn: String,
    scope: SearchScope,
    attributes: Vec<String>,
    filters: Option<TemplateGenerator>,
}

impl SearchWorkload {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            counters: Counters::default(),
            base_dn: String::new(),
            scope: SearchScope::default(),
            attributes: Vec::new(),
            filters: None,
        }
    }
}

#[async_trait]
impl Workload for SearchWorkload {
    workload_accessors!(OperationKind::Search);

    async fn prepare(&mut self, config: &RunConfig) -> Result<()> {
        let worker_id = self.session.worker_id();
        let WorkloadParams::Search(params) = &config.params else {
            return Err(BenchError::InvalidConfig(
                "search workload needs search parameters".to_string(),
            ));
        };
        let SearchParams {
            scope,
            filter,
            attributes,
            ..
        } = params;

        self.session.bind(config).await?;

        let template = Template::parse(filter)?;
        let range = config.id_range();
        if template.is_parameterized() && range.is_none() {
            warn!(worker_id, %filter, "filter has a placeholder but no id range; searching literally");
        }
        debug!(worker_id, %scope, %filter, ?range, "prepare");

        self.base_dn = config.base_dn.clone();
        self.scope = *scope;
        self.attributes = attributes.clone();
        self.filters = Some(TemplateGenerator::new(template, range));
        Ok(())
    }

    async fn request(&mut self) -> bool {
        let worker_id = self.session.worker_id();
        let filter = match self.filters.as_mut() {
            Some(filters) => filters.next_value(),
            None => return false,
        };

        let client = match self.session.client() {
            Ok(client) => client,
            Err(_) => return false,
        };
        match client
            .search(&self.base_dn, self.scope, &filter, &self.attributes)
            .await
        {
            Ok(entries) => !entries.is_empty(),
            Err(e) => {
                debug!(worker_id, %filter, error = %e, "search failed");
                false
            }
        }
    }
}
