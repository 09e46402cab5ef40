use libldapbench_core::{
    render_compact, render_verbose, BenchError, HostInfo, ReportOptions, RunConfig,
    WorkloadParams,
};

use crate::cli::{Cli, RunArgs};
use crate::commands::Connection;
use crate::output::{output_json, print_human};

pub async fn run(cli: &Cli, args: &RunArgs, params: WorkloadParams) -> Result<(), BenchError> {
    let connection = Connection::resolve(cli, &args.connection)?;
    let connector = connection.connector();

    let mut config = RunConfig::new(connection.url, params);
    config.requests = args.requests;
    config.concurrency = args.concurrency;
    config.bind_dn = connection.bind_dn;
    config.bind_password = connection.bind_password;
    config.base_dn = connection.base_dn;
    config.starttls = connection.starttls;
    let kind = config.kind();

    if !args.short {
        print_human(cli, &format!("This is LDAPBench, Version {}", env!("CARGO_PKG_VERSION")));
        print_human(cli, &format!("{} Benchmarking: {}", kind.label(), config.url));
        print_human(cli, "");
    }

    let stats = libldapbench_core::run(config, connector).await?;
    let host = HostInfo::detect();
    let summary = stats.summary(kind, &host);

    if let Some(path) = &args.json_report {
        let report = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, report)?;
        if !args.short {
            print_human(cli, &format!("Report saved to {}", path.display()));
        }
    }

    if cli.json {
        output_json(&summary)
    } else if args.short {
        println!("{}", render_compact(&stats));
        Ok(())
    } else {
        let options = ReportOptions {
            per_worker: args.per_worker,
            histogram: args.histogram,
        };
        println!("{}", render_verbose(&stats, &host, options));
        Ok(())
    }
}
