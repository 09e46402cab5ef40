//! Workloads: one implementation per benchmarked operation
//!
//! The worker drives every workload through the same four steps:
//! [`connect`](Workload::connect), [`prepare`](Workload::prepare),
//! [`request`](Workload::request) in the timed loop, and
//! [`finish`](Workload::finish). The concrete type is chosen once from
//! [`WorkloadParams`] by [`build_workload`].

/// Implements the bookkeeping accessors for a workload struct with
/// `session`, `counters` fields and a fixed [`OperationKind`].
macro_rules! workload_accessors {
    ($kind:expr) => {
        fn kind(&self) -> $crate::config::OperationKind {
            $kind
        }

        fn session(&mut self) -> &mut $crate::workload::Session {
            &mut self.session
        }

        fn counters(&self) -> $crate::workload::Counters {
            self.counters
        }

        fn counters_mut(&mut self) -> &mut $crate::workload::Counters {
            &mut self.counters
        }
    };
}

mod add;
mod bind;
mod delete;
mod modify;
mod noop;
mod passmod;
mod search;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

pub use add::AddWorkload;
pub use bind::BindWorkload;
pub use delete::DeleteWorkload;
pub use modify::ModifyWorkload;
pub use noop::NoopWorkload;
pub use passmod::PasswordModifyWorkload;
pub use search::SearchWorkload;

use crate::config::{OperationKind, RunConfig, WorkloadParams};
use crate::directory::{DirectoryClient, DirectoryConnector, DirectoryError};
use crate::error::{BenchError, Result};

/// Request counters owned by one workload and advanced only by its worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: u64,
    pub success: u64,
}

impl Counters {
    /// Count one finished request
    pub fn record(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.success += 1;
        }
    }
}

/// Connection state shared by every concrete workload through composition
pub struct Session {
    connector: Arc<dyn DirectoryConnector>,
    client: Option<Box<dyn DirectoryClient>>,
    worker_id: usize,
}

impl Session {
    pub fn new(connector: Arc<dyn DirectoryConnector>) -> Self {
        Self {
            connector,
            client: None,
            worker_id: 0,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Open the connection for `worker_id`
    pub async fn connect(&mut self, worker_id: usize, config: &RunConfig) -> Result<()> {
        self.worker_id = worker_id;
        debug!(worker_id, url = %config.url, starttls = config.starttls, "connecting");
        let client = self
            .connector
            .connect(&config.url, config.starttls)
            .await
            .map_err(|source| BenchError::Connect { worker_id, source })?;
        self.client = Some(client);
        Ok(())
    }

    /// Bind with the configured credentials; failure is fatal for the run
    pub async fn bind(&mut self, config: &RunConfig) -> Result<()> {
        let worker_id = self.worker_id;
        let dn = config.bind_dn.clone();
        self.client()
            .map_err(|source| BenchError::Bind {
                worker_id,
                dn: dn.clone(),
                source,
            })?
            .bind(&config.bind_dn, &config.bind_password)
            .await
            .map_err(|source| BenchError::Bind { worker_id, dn, source })
    }

    /// The open connection
    pub fn client(&mut self) -> std::result::Result<&mut (dyn DirectoryClient + 'static), DirectoryError> {
        self.client.as_deref_mut().ok_or(DirectoryError::NotConnected)
    }

    /// Release the connection; errors are logged, never raised
    pub async fn close(&mut self) {
        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.close().await {
                warn!(worker_id = self.worker_id, error = %e, "close failed");
            }
        }
    }
}

/// `cn={worker_id}-{sequence},{base_dn}`, the entry owned by one request
pub fn sequence_dn(worker_id: usize, sequence: u64, base_dn: &str) -> String {
    format!("cn={}-{},{}", worker_id, sequence, base_dn)
}

/// Log a failed request at debug level and turn it into `false`
pub(crate) fn outcome(
    worker_id: usize,
    kind: OperationKind,
    result: std::result::Result<(), DirectoryError>,
) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(worker_id, operation = %kind, error = %e, "request failed");
            false
        }
    }
}

/// One operation type's setup and per-iteration request logic
#[async_trait]
pub trait Workload: Send {
    fn kind(&self) -> OperationKind;

    fn session(&mut self) -> &mut Session;

    fn counters(&self) -> Counters;

    fn counters_mut(&mut self) -> &mut Counters;

    /// Establish the directory connection. Failure aborts the run.
    async fn connect(&mut self, worker_id: usize, config: &RunConfig) -> Result<()> {
        self.session().connect(worker_id, config).await
    }

    /// Bind and parse operation parameters. Failure aborts the run.
    async fn prepare(&mut self, config: &RunConfig) -> Result<()>;

    /// Perform exactly one operation. Failures are reported as `false`.
    async fn request(&mut self) -> bool;

    /// Release the connection. Always called.
    async fn finish(&mut self) {
        self.session().close().await;
    }
}

/// Create a fresh workload of the kind selected by `config.params`
pub fn build_workload(
    config: &RunConfig,
    connector: Arc<dyn DirectoryConnector>,
) -> Box<dyn Workload> {
    let session = Session::new(connector);
    match &config.params {
        WorkloadParams::Noop(p) => Box::new(NoopWorkload::new(session, p.clone())),
        WorkloadParams::Add(p) => Box::new(AddWorkload::new(session, p.clone())),
        WorkloadParams::Bind(_) => Box::new(BindWorkload::new(session)),
        WorkloadParams::Delete => Box::new(DeleteWorkload::new(session)),
        WorkloadParams::Modify(p) => Box::new(ModifyWorkload::new(session, p.clone())),
        WorkloadParams::Search(_) => Box::new(SearchWorkload::new(session)),
        WorkloadParams::Passmod(p) => Box::new(PasswordModifyWorkload::new(session, p.clone())),
    }
}
