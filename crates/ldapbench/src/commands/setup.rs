use libldapbench_core::setup::{self, PersonSpec, SetupOutcome, SetupTarget};
use libldapbench_core::BenchError;

use crate::cli::{Cli, SetupCommand};
use crate::commands::Connection;
use crate::output::{output_json, print_human};

pub async fn run(cli: &Cli, cmd: SetupCommand) -> Result<(), BenchError> {
    match cmd {
        SetupCommand::Base { connection } => {
            let connection = Connection::resolve(cli, &connection)?;
            let connector = connection.connector();
            let target = target(connection);
            print_human(cli, &format!("Adding base entry: {}", target.base_dn));
            let outcome = setup::setup_base(connector, &target).await?;
            report(cli, "base", outcome)
        }
        SetupCommand::Person {
            connection,
            cn,
            sn,
            password,
            range,
        } => {
            let connection = Connection::resolve(cli, &connection)?;
            let connector = connection.connector();
            let target = target(connection);
            let spec = PersonSpec {
                cn,
                sn,
                password,
                first: range.first,
                last: range.last,
            };
            let outcome = setup::setup_person(connector, &target, &spec).await?;
            report(cli, "person", outcome)
        }
    }
}

fn target(connection: Connection) -> SetupTarget {
    SetupTarget {
        url: connection.url,
        starttls: connection.starttls,
        bind_dn: connection.bind_dn,
        bind_password: connection.bind_password,
        base_dn: connection.base_dn,
    }
}

fn report(cli: &Cli, kind: &str, outcome: SetupOutcome) -> Result<(), BenchError> {
    for dn in &outcome.added {
        print_human(cli, &format!("Added {} entry: {}", kind, dn));
    }
    if !cli.json {
        for failure in &outcome.failed {
            eprintln!("Add error for {}: {}", failure.dn, failure.error);
        }
    }

    let attempted = outcome.added.len() + outcome.failed.len();
    let failed = outcome.failed.len();
    if failed > 0 {
        return Err(BenchError::Setup(format!(
            "{} of {} {} entries could not be added",
            failed, attempted, kind
        )));
    }
    if cli.json {
        output_json(&outcome)?;
    }
    Ok(())
}
