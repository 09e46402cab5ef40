//! End-to-end runs against the in-memory directory
//!
//! These tests go through the public `run` entry point, so they cover the
//! workers, the start barrier and the statistics together.

use std::sync::Arc;

use libldapbench_core::config::{AddParams, BindParams, NoopParams, SearchParams};
use libldapbench_core::report::{render_compact, render_verbose, HostInfo, ReportOptions};
use libldapbench_core::setup::{setup_person, PersonSpec, SetupTarget};
use libldapbench_core::{run, BenchError, MemoryDirectory, RunConfig, WorkloadParams};

const ROOT_DN: &str = "cn=Manager,dc=example,dc=com";

fn directory() -> MemoryDirectory {
    MemoryDirectory::new().with_root(ROOT_DN, "secret")
}

fn config(params: WorkloadParams, requests: u64, concurrency: usize) -> RunConfig {
    let mut config = RunConfig::new("ldap://memory", params);
    config.requests = requests;
    config.concurrency = concurrency;
    config
}

#[tokio::test]
async fn test_realized_total_is_rounded_up() {
    let dir = directory();
    let stats = run(
        config(WorkloadParams::Noop(NoopParams::default()), 10, 4),
        Arc::new(dir.clone()),
    )
    .await
    .unwrap();

    assert_eq!(stats.total_requests, 12);
    assert_eq!(stats.successful_requests, 12);
    assert_eq!(stats.workers.len(), 4);
    for (i, worker) in stats.workers.iter().enumerate() {
        assert_eq!(worker.worker_id, i);
        assert_eq!(worker.total_requests, 3);
        assert!(stats.wall_clock >= worker.elapsed);
    }
    assert_eq!(stats.success_rate(), Some(100));
    assert_eq!(stats.latency.samples, 12);
    assert_eq!(dir.connection_count(), 4);
}

#[tokio::test]
async fn test_add_then_delete_leaves_directory_empty() {
    let dir = directory();

    let added = run(
        config(WorkloadParams::Add(AddParams::default()), 20, 4),
        Arc::new(dir.clone()),
    )
    .await
    .unwrap();
    assert_eq!(added.successful_requests, 20);
    assert_eq!(dir.len(), 20);
    assert!(dir.contains("cn=3-4,dc=example,dc=com"));

    let deleted = run(config(WorkloadParams::Delete, 20, 4), Arc::new(dir.clone()))
        .await
        .unwrap();
    assert_eq!(deleted.successful_requests, 20);
    assert!(dir.is_empty());
}

#[tokio::test]
async fn test_delete_without_entries_completes_at_zero_percent() {
    let dir = directory();
    let stats = run(config(WorkloadParams::Delete, 6, 2), Arc::new(dir))
        .await
        .unwrap();
    assert_eq!(stats.total_requests, 6);
    assert_eq!(stats.success_rate(), Some(0));
}

#[tokio::test]
async fn test_failures_after_connect_complete_the_run() {
    let dir = directory().unreachable_after_connect();
    let params = WorkloadParams::Bind(BindParams::default());
    let stats = run(config(params, 8, 2), Arc::new(dir)).await.unwrap();

    assert_eq!(stats.total_requests, 8);
    assert_eq!(stats.successful_requests, 0);
    assert_eq!(render_compact(&stats).split(' ').last(), Some("0%"));
}

#[tokio::test]
async fn test_templated_bind_against_populated_directory() {
    let dir = directory();
    let target = SetupTarget {
        url: "ldap://memory".to_string(),
        starttls: false,
        bind_dn: ROOT_DN.to_string(),
        bind_password: "secret".to_string(),
        base_dn: "dc=example,dc=com".to_string(),
    };
    let spec = PersonSpec {
        last: 50,
        ..Default::default()
    };
    setup_person(Arc::new(dir.clone()), &target, &spec)
        .await
        .unwrap();

    let mut bind = config(
        WorkloadParams::Bind(BindParams { first: 1, last: 50 }),
        40,
        4,
    );
    bind.bind_dn = "cn=user%d,dc=example,dc=com".to_string();
    let stats = run(bind, Arc::new(dir.clone())).await.unwrap();
    assert_eq!(stats.successful_requests, 40);

    let search = config(
        WorkloadParams::Search(SearchParams {
            filter: "(cn=user%d)".to_string(),
            first: 1,
            last: 50,
            ..Default::default()
        }),
        40,
        4,
    );
    let stats = run(search, Arc::new(dir)).await.unwrap();
    assert_eq!(stats.successful_requests, 40);
}

#[tokio::test]
async fn test_zero_requests_reports_no_requests() {
    let stats = run(
        config(WorkloadParams::Noop(NoopParams::default()), 0, 3),
        Arc::new(directory()),
    )
    .await
    .unwrap();

    assert_eq!(stats.total_requests, 0);
    assert_eq!(render_compact(&stats), "3 no requests completed");
    let host = HostInfo::detect();
    let text = render_verbose(&stats, &host, ReportOptions::default());
    assert!(text.contains("No requests completed"));
}

#[tokio::test]
async fn test_zero_workers_reports_no_requests() {
    let stats = run(
        config(WorkloadParams::Noop(NoopParams::default()), 10, 0),
        Arc::new(directory()),
    )
    .await
    .unwrap();
    assert!(stats.workers.is_empty());
    assert_eq!(render_compact(&stats), "0 no requests completed");
}

#[tokio::test]
async fn test_wrong_bind_password_aborts_run() {
    let mut config = config(WorkloadParams::Search(SearchParams::default()), 10, 2);
    config.bind_password = "wrong".to_string();

    let err = run(config, Arc::new(directory())).await.unwrap_err();
    assert!(matches!(err, BenchError::Bind { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_refused_connection_aborts_run() {
    let dir = MemoryDirectory::new().refusing_connections();
    let err = run(
        config(WorkloadParams::Noop(NoopParams::default()), 10, 2),
        Arc::new(dir),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BenchError::Connect { .. }));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_spawning() {
    let dir = directory();
    let mut config = config(WorkloadParams::Noop(NoopParams::default()), 10, 2);
    config.url = String::new();

    let err = run(config, Arc::new(dir.clone())).await.unwrap_err();
    assert!(matches!(err, BenchError::InvalidConfig(_)));
    assert_eq!(dir.connection_count(), 0);
}
