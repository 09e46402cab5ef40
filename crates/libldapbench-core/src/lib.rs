pub mod config;
pub mod directory;
pub mod error;
pub mod latency;
pub mod memory;
pub mod orchestrator;
pub mod report;
pub mod setup;
pub mod template;
pub mod worker;
pub mod workload;

use std::sync::Arc;

use tracing::info;

pub use config::{
    load_profile, ConnectionProfile, OperationKind, RunConfig, WorkloadParams,
};
pub use directory::{DirectoryClient, DirectoryConnector, DirectoryError, SearchScope};
pub use error::{BenchError, Result};
pub use memory::MemoryDirectory;
pub use orchestrator::{Orchestrator, Phase};
pub use report::{
    render_compact, render_verbose, HostInfo, ReportOptions, RunStatistics, RunSummary,
};
pub use worker::WorkerResult;

/// Run one benchmark to completion and compute its statistics
pub async fn run(config: RunConfig, connector: Arc<dyn DirectoryConnector>) -> Result<RunStatistics> {
    config.validate()?;
    let concurrency = config.concurrency;
    info!(
        operation = %config.kind(),
        url = %config.url,
        requests = config.requests,
        concurrency,
        "starting benchmark"
    );

    let mut orchestrator = Orchestrator::new(config);
    let results = orchestrator.run(connector).await?;
    Ok(RunStatistics::from_results(concurrency, &results))
}
