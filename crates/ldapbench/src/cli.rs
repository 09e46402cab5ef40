use clap::{ArgAction, Args, Parser, Subcommand};
use libldapbench_core::SearchScope;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ldapbench", about = "LDAP server benchmarking tool", version)]
pub struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress the banner and progress messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Connection profile (TOML) with url, bind_dn, bind_password, base_dn, starttls
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where to connect and as whom
#[derive(Clone, Debug, Args)]
pub struct ConnectionArgs {
    /// Server URL, e.g. ldap://localhost:389 (memory:// runs against an in-process directory)
    pub url: Option<String>,

    /// Bind DN
    #[arg(short = 'D', long)]
    pub bind_dn: Option<String>,

    /// Bind password
    #[arg(short = 'w', long)]
    pub bind_password: Option<String>,

    /// Base DN
    #[arg(short = 'b', long)]
    pub base_dn: Option<String>,

    /// Upgrade the connection with StartTLS
    #[arg(short = 'Z', long)]
    pub starttls: bool,
}

/// Options shared by every benchmark
#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Total number of requests
    #[arg(short = 'n', long, default_value_t = 1)]
    pub requests: u64,

    /// Number of concurrent workers
    #[arg(short = 'c', long, default_value_t = 1)]
    pub concurrency: usize,

    /// Print `concurrency throughput success%` on one line
    #[arg(long)]
    pub short: bool,

    /// Include latency percentiles in the report
    #[arg(long)]
    pub histogram: bool,

    /// Include a per-worker table in the report
    #[arg(long)]
    pub per_worker: bool,

    /// Write the JSON report to this file
    #[arg(long)]
    pub json_report: Option<PathBuf>,
}

/// Inclusive id range substituted into `%d` templates
#[derive(Clone, Debug, Args)]
pub struct RangeArgs {
    /// First id
    #[arg(long, default_value_t = 1)]
    pub first: u64,

    /// Last id (0 disables substitution)
    #[arg(long, default_value_t = 0)]
    pub last: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Benchmark add operations
    Add {
        #[command(flatten)]
        run: RunArgs,

        /// Use a random UUID as the cn of each entry
        #[arg(long)]
        uuid: bool,
    },

    /// Benchmark simple binds; -D may contain a %d placeholder
    Bind {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Benchmark delete operations on entries created by `add`
    Delete {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Benchmark modify (replace) operations on entries created by `add`
    Modify {
        #[command(flatten)]
        run: RunArgs,

        /// Attribute to replace
        #[arg(long, default_value = "sn")]
        attr: String,

        /// Replacement value
        #[arg(long, default_value = "modified")]
        value: String,
    },

    /// Benchmark search operations; the filter may contain a %d placeholder
    Search {
        #[command(flatten)]
        run: RunArgs,

        /// Search scope: base, one, sub, or children
        #[arg(short = 's', long, default_value = "sub")]
        scope: SearchScope,

        /// Search filter
        #[arg(short = 'a', long, default_value = "(objectClass=*)")]
        filter: String,

        /// Attributes to return (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "dn")]
        attributes: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Benchmark the password modify extended operation
    Passmod {
        #[command(flatten)]
        run: RunArgs,

        /// New password to set
        #[arg(long, default_value = "newsecret")]
        new_password: String,

        /// Old password (defaults to the bind password)
        #[arg(long)]
        old_password: Option<String>,
    },

    /// Connectivity test: connect, then idle for each request
    Test {
        #[command(flatten)]
        run: RunArgs,

        /// Sleep per request in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },

    /// Populate the directory
    Setup {
        #[command(subcommand)]
        cmd: SetupCommand,
    },
}

#[derive(Clone, Subcommand)]
pub enum SetupCommand {
    /// Create the base entry
    Base {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Create person entries
    Person {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// cn prefix, or a template such as user%04d
        #[arg(long, default_value = "user")]
        cn: String,

        /// sn attribute (defaults to the cn)
        #[arg(long)]
        sn: Option<String>,

        /// userPassword attribute
        #[arg(long, default_value = "secret")]
        password: String,

        #[command(flatten)]
        range: RangeArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "ldapbench",
            "-vv",
            "search",
            "ldap://localhost",
            "-n",
            "100",
            "-c",
            "4",
            "-s",
            "one",
            "-a",
            "(uid=user%d)",
            "--attributes",
            "cn,mail",
            "--first",
            "1",
            "--last",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Search {
                run,
                scope,
                filter,
                attributes,
                range,
            } => {
                assert_eq!(run.connection.url.as_deref(), Some("ldap://localhost"));
                assert_eq!(run.requests, 100);
                assert_eq!(run.concurrency, 4);
                assert_eq!(scope, SearchScope::One);
                assert_eq!(filter, "(uid=user%d)");
                assert_eq!(attributes, vec!["cn", "mail"]);
                assert_eq!((range.first, range.last), (1, 50));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ldapbench", "add", "ldap://localhost"]).unwrap();
        match cli.command {
            Command::Add { run, uuid } => {
                assert_eq!(run.requests, 1);
                assert_eq!(run.concurrency, 1);
                assert!(!run.short);
                assert!(!run.connection.starttls);
                assert!(run.connection.bind_dn.is_none());
                assert!(!uuid);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_url_is_optional() {
        let cli = Cli::try_parse_from([
            "ldapbench",
            "--config",
            "lb.toml",
            "bind",
            "-D",
            "cn=user%d,dc=example,dc=com",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("lb.toml")));
        match cli.command {
            Command::Bind { run, range } => {
                assert!(run.connection.url.is_none());
                assert_eq!(range.last, 0);
            }
            _ => panic!("expected bind"),
        }
    }

    #[test]
    fn test_setup_person() {
        let cli = Cli::try_parse_from([
            "ldapbench",
            "setup",
            "person",
            "ldap://localhost",
            "--cn",
            "u%03d",
            "--last",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Setup {
                cmd: SetupCommand::Person { cn, password, range, .. },
            } => {
                assert_eq!(cn, "u%03d");
                assert_eq!(password, "secret");
                assert_eq!(range.last, 10);
            }
            _ => panic!("expected setup person"),
        }
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let result = Cli::try_parse_from(["ldapbench", "search", "ldap://localhost", "-s", "all"]);
        assert!(result.is_err());
    }
}
