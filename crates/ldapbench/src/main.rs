//! ldapbench - LDAP server benchmarking tool
//!
//! Runs a fixed number of directory operations across concurrent workers
//! and reports throughput, success rate and latency.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use libldapbench_core::config::{
    AddParams, BindParams, ModifyParams, NoopParams, PassmodParams, SearchParams,
};
use libldapbench_core::{BenchError, WorkloadParams};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run_command(&cli).await {
        output::output_error(&cli, &e);
        std::process::exit(e.exit_code());
    }
}

/// RUST_LOG wins; otherwise each -v raises the level one step from warn
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_command(cli: &Cli) -> Result<(), BenchError> {
    match &cli.command {
        Command::Add { run, uuid } => {
            let params = WorkloadParams::Add(AddParams { uuid: *uuid });
            commands::bench::run(cli, run, params).await
        }
        Command::Bind { run, range } => {
            let params = WorkloadParams::Bind(BindParams {
                first: range.first,
                last: range.last,
            });
            commands::bench::run(cli, run, params).await
        }
        Command::Delete { run } => commands::bench::run(cli, run, WorkloadParams::Delete).await,
        Command::Modify { run, attr, value } => {
            let params = WorkloadParams::Modify(ModifyParams {
                attr: attr.clone(),
                value: value.clone(),
            });
            commands::bench::run(cli, run, params).await
        }
        Command::Search {
            run,
            scope,
            filter,
            attributes,
            range,
        } => {
            let params = WorkloadParams::Search(SearchParams {
                scope: *scope,
                filter: filter.clone(),
                attributes: attributes.clone(),
                first: range.first,
                last: range.last,
            });
            commands::bench::run(cli, run, params).await
        }
        Command::Passmod {
            run,
            new_password,
            old_password,
        } => {
            let params = WorkloadParams::Passmod(PassmodParams {
                new_password: new_password.clone(),
                old_password: old_password.clone(),
            });
            commands::bench::run(cli, run, params).await
        }
        Command::Test { run, delay_ms } => {
            let params = WorkloadParams::Noop(NoopParams {
                delay_ms: *delay_ms,
            });
            commands::bench::run(cli, run, params).await
        }
        Command::Setup { cmd } => commands::setup::run(cli, cmd.clone()).await,
    }
}
