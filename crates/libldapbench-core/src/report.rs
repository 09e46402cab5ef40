//! Run statistics and report rendering
//!
//! Statistics are computed over the union of the workers' windows: the
//! wall-clock span runs from the earliest start to the latest end, so
//! overlapping workers are not double counted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::{Deserialize, Serialize};

use crate::config::OperationKind;
use crate::latency::{
    format_latency, LatencyBucket, LatencyHistogram, LatencyPercentiles, DISTRIBUTION_ROWS,
};
use crate::worker::WorkerResult;

pub const NO_REQUESTS: &str = "no requests completed";

/// Per-worker line in the statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker_id: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    #[serde(with = "serde_duration")]
    pub elapsed: Duration,
}

impl WorkerSummary {
    pub fn throughput(&self) -> Option<f64> {
        rate(self.total_requests, self.elapsed)
    }
}

/// Aggregate statistics for one run, computed once from every worker result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub concurrency: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    /// `max(end_time) - min(start_time)` across workers
    #[serde(with = "serde_duration")]
    pub wall_clock: Duration,
    pub workers: Vec<WorkerSummary>,
    pub latency: LatencyPercentiles,
    #[serde(default)]
    pub distribution: Vec<LatencyBucket>,
}

impl RunStatistics {
    pub fn from_results(concurrency: usize, results: &[WorkerResult]) -> Self {
        let first_start = results.iter().map(|r| r.start_time).min();
        let last_end = results.iter().map(|r| r.end_time).max();
        let wall_clock = match (first_start, last_end) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        };

        let mut latency = LatencyHistogram::new();
        for result in results {
            latency.merge(&result.latency);
        }

        Self {
            concurrency,
            total_requests: results.iter().map(|r| r.total_requests).sum(),
            successful_requests: results.iter().map(|r| r.successful_requests).sum(),
            wall_clock,
            workers: results
                .iter()
                .map(|r| WorkerSummary {
                    worker_id: r.worker_id,
                    total_requests: r.total_requests,
                    successful_requests: r.successful_requests,
                    elapsed: r.elapsed(),
                })
                .collect(),
            latency: latency.percentiles(),
            distribution: latency.distribution(DISTRIBUTION_ROWS),
        }
    }

    pub fn has_requests(&self) -> bool {
        self.total_requests > 0
    }

    /// Requests per second over the wall-clock span
    pub fn throughput(&self) -> Option<f64> {
        rate(self.total_requests, self.wall_clock)
    }

    /// Integer percentage, truncated
    pub fn success_rate(&self) -> Option<u64> {
        (self.total_requests > 0)
            .then(|| self.successful_requests * 100 / self.total_requests)
    }

    /// Mean time per request as seen by one worker, in milliseconds
    pub fn time_per_request_ms(&self) -> Option<f64> {
        (self.total_requests > 0).then(|| {
            self.concurrency as f64 * self.wall_clock.as_secs_f64() * 1000.0
                / self.total_requests as f64
        })
    }

    /// Mean time per request across all concurrent requests, in milliseconds
    pub fn time_per_request_all_ms(&self) -> Option<f64> {
        (self.total_requests > 0)
            .then(|| self.wall_clock.as_secs_f64() * 1000.0 / self.total_requests as f64)
    }

    /// Serializable snapshot with every derived figure filled in
    pub fn summary(&self, operation: OperationKind, host: &HostInfo) -> RunSummary {
        RunSummary {
            operation,
            generated_at: Utc::now(),
            statistics: self.clone(),
            throughput: self.throughput(),
            success_rate: self.success_rate(),
            time_per_request_ms: self.time_per_request_ms(),
            time_per_request_all_ms: self.time_per_request_all_ms(),
            host: host.clone(),
        }
    }
}

fn rate(requests: u64, span: Duration) -> Option<f64> {
    let secs = span.as_secs_f64();
    (requests > 0 && secs > 0.0).then(|| requests as f64 / secs)
}

/// CPU information about the machine generating load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub cpus: usize,
    pub physical_cpus: usize,
    pub parallelism: usize,
}

impl HostInfo {
    pub fn detect() -> Self {
        let cpus = num_cpus::get();
        Self {
            cpus,
            physical_cpus: num_cpus::get_physical(),
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(cpus),
        }
    }
}

/// JSON report body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub operation: OperationKind,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub statistics: RunStatistics,
    pub throughput: Option<f64>,
    pub success_rate: Option<u64>,
    pub time_per_request_ms: Option<f64>,
    pub time_per_request_all_ms: Option<f64>,
    pub host: HostInfo,
}

/// Optional sections of the verbose report
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub per_worker: bool,
    pub histogram: bool,
}

/// Multi-line human-readable report
pub fn render_verbose(stats: &RunStatistics, host: &HostInfo, options: ReportOptions) -> String {
    let mut lines = vec![
        format!("Concurrency Level: {}", stats.concurrency),
        format!("Total Requests: {}", stats.total_requests),
        format!("Success Requests: {}", stats.successful_requests),
    ];

    match (stats.success_rate(), stats.time_per_request_ms(), stats.time_per_request_all_ms()) {
        (Some(success_rate), Some(tpr), Some(tpr_all)) => {
            let rps = stats
                .throughput()
                .map(|r| format!("{:.2}", r))
                .unwrap_or_else(|| "n/a".to_string());
            lines.push(format!("Success Rate: {}%", success_rate));
            lines.push(format!(
                "Time taken for tests: {:.3} seconds",
                stats.wall_clock.as_secs_f64()
            ));
            lines.push(format!("Requests per second: {} [#/sec] (mean)", rps));
            lines.push(format!("Time per request: {:.3} [ms] (mean)", tpr));
            lines.push(format!(
                "Time per request: {:.3} [ms] (mean, across all concurrent requests)",
                tpr_all
            ));
        }
        _ => lines.push("No requests completed".to_string()),
    }

    lines.push(format!("CPU Number: {}", host.cpus));
    lines.push(format!("Physical CPUs: {}", host.physical_cpus));
    lines.push(format!("Available Parallelism: {}", host.parallelism));

    if options.per_worker && !stats.workers.is_empty() {
        lines.push(String::new());
        lines.push(worker_table(stats).to_string());
    }

    if options.histogram {
        lines.push(String::new());
        lines.push(format!("Total samples: {}", stats.latency.samples));
        lines.push("Latency Percentiles:".to_string());
        if stats.latency.samples == 0 {
            lines.push("  no latency data collected".to_string());
        } else {
            for (label, us) in stats.latency.rows() {
                lines.push(format!("  {:>6}: {:>12}", label, format_latency(us)));
            }
            lines.push(String::new());
            lines.push("Latency Distribution:".to_string());
            lines.extend(distribution_rows(&stats.distribution, stats.latency.samples));
        }
    }

    lines.join("\n")
}

const BAR_WIDTH: u64 = 40;

/// One line per bucket: range, count, share of all samples and a `#` bar
/// scaled against the fullest bucket
fn distribution_rows(buckets: &[LatencyBucket], samples: u64) -> Vec<String> {
    let fullest = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    buckets
        .iter()
        .map(|bucket| {
            let range = if bucket.low_us == bucket.high_us {
                format_latency(bucket.low_us)
            } else {
                format!(
                    "{} - {}",
                    format_latency(bucket.low_us),
                    format_latency(bucket.high_us)
                )
            };
            let share = bucket.count as f64 * 100.0 / samples.max(1) as f64;
            let bar = "#".repeat((bucket.count * BAR_WIDTH / fullest) as usize);
            format!("  {:>21}: {:>6} ({:>5.1}%) {}", range, bucket.count, share, bar)
        })
        .collect()
}

/// `concurrency throughput success_rate%` for scripted consumption
pub fn render_compact(stats: &RunStatistics) -> String {
    match stats.success_rate() {
        Some(success_rate) => format!(
            "{} {:.2} {}%",
            stats.concurrency,
            stats.throughput().unwrap_or(0.0),
            success_rate
        ),
        None => format!("{} {}", stats.concurrency, NO_REQUESTS),
    }
}

fn worker_table(stats: &RunStatistics) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Worker", "Requests", "Success", "Time [s]", "Rate [#/sec]"]);
    for worker in &stats.workers {
        table.add_row(vec![
            worker.worker_id.to_string(),
            worker.total_requests.to_string(),
            worker.successful_requests.to_string(),
            format!("{:.3}", worker.elapsed.as_secs_f64()),
            worker
                .throughput()
                .map(|r| format!("{:.2}", r))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

mod serde_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn result(
        worker_id: usize,
        total: u64,
        success: u64,
        start_ms: u64,
        end_ms: u64,
        base: Instant,
    ) -> WorkerResult {
        WorkerResult {
            worker_id,
            total_requests: total,
            successful_requests: success,
            start_time: base + Duration::from_millis(start_ms),
            end_time: base + Duration::from_millis(end_ms),
            latency: LatencyHistogram::new(),
        }
    }

    fn host() -> HostInfo {
        HostInfo {
            cpus: 8,
            physical_cpus: 4,
            parallelism: 8,
        }
    }

    #[test]
    fn test_wall_clock_spans_overlapping_workers() {
        let base = Instant::now();
        let results = vec![
            result(0, 10, 10, 0, 1000, base),
            result(1, 10, 8, 200, 1500, base),
            result(2, 10, 9, 100, 900, base),
        ];
        let stats = RunStatistics::from_results(3, &results);

        assert_eq!(stats.wall_clock, Duration::from_millis(1500));
        for r in &results {
            assert!(stats.wall_clock >= r.elapsed());
        }
        assert_eq!(stats.total_requests, 30);
        assert_eq!(stats.successful_requests, 27);
        assert_eq!(stats.success_rate(), Some(90));
        assert!((stats.throughput().unwrap() - 20.0).abs() < 1e-9);
        assert!((stats.time_per_request_all_ms().unwrap() - 50.0).abs() < 1e-9);
        assert!((stats.time_per_request_ms().unwrap() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_bounds_and_truncation() {
        let base = Instant::now();
        let none = RunStatistics::from_results(1, &[result(0, 7, 0, 0, 10, base)]);
        assert_eq!(none.success_rate(), Some(0));

        let all = RunStatistics::from_results(1, &[result(0, 7, 7, 0, 10, base)]);
        assert_eq!(all.success_rate(), Some(100));

        let two_thirds = RunStatistics::from_results(1, &[result(0, 3, 2, 0, 10, base)]);
        assert_eq!(two_thirds.success_rate(), Some(66));
    }

    #[test]
    fn test_no_requests_is_reported_not_divided() {
        let stats = RunStatistics::from_results(4, &[]);
        assert!(!stats.has_requests());
        assert_eq!(stats.success_rate(), None);
        assert_eq!(stats.throughput(), None);
        assert_eq!(stats.time_per_request_ms(), None);

        let verbose = render_verbose(&stats, &host(), ReportOptions::default());
        assert!(verbose.contains("No requests completed"));
        assert!(!verbose.contains("Requests per second"));
        assert_eq!(render_compact(&stats), "4 no requests completed");
    }

    #[test]
    fn test_zero_iteration_workers_report_no_requests() {
        let base = Instant::now();
        let results = [result(0, 0, 0, 0, 0, base), result(1, 0, 0, 0, 0, base)];
        let stats = RunStatistics::from_results(2, &results);
        assert_eq!(render_compact(&stats), "2 no requests completed");
    }

    #[test]
    fn test_render_verbose() {
        let base = Instant::now();
        let mut results = [result(0, 50, 50, 0, 500, base), result(1, 50, 25, 0, 1000, base)];
        for _ in 0..3 {
            results[0].latency.record(Duration::from_micros(400));
        }
        results[1].latency.record(Duration::from_millis(2));
        let stats = RunStatistics::from_results(2, &results);
        let text = render_verbose(
            &stats,
            &host(),
            ReportOptions {
                per_worker: true,
                histogram: true,
            },
        );

        assert!(text.contains("Concurrency Level: 2"));
        assert!(text.contains("Total Requests: 100"));
        assert!(text.contains("Success Requests: 75"));
        assert!(text.contains("Success Rate: 75%"));
        assert!(text.contains("Time taken for tests: 1.000 seconds"));
        assert!(text.contains("Requests per second: 100.00 [#/sec] (mean)"));
        assert!(text.contains("Time per request: 20.000 [ms] (mean)"));
        assert!(text.contains("Time per request: 10.000 [ms] (mean, across all concurrent requests)"));
        assert!(text.contains("CPU Number: 8"));
        assert!(text.contains("Worker"));
        assert!(text.contains("Total samples: 4"));
        assert!(text.contains("Latency Percentiles:"));
        assert!(text.contains("Latency Distribution:"));

        let rows: Vec<&str> = text.lines().filter(|l| l.ends_with('#')).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("400 us:      3 ( 75.0%) "));
        assert!(rows[0].ends_with(&"#".repeat(40)));
        assert!(rows[1].contains("( 25.0%)"));
        assert!(rows[1].ends_with(&format!(" {}", "#".repeat(13))));
    }

    #[test]
    fn test_render_histogram_without_samples() {
        let base = Instant::now();
        let stats = RunStatistics::from_results(1, &[result(0, 5, 5, 0, 100, base)]);
        let text = render_verbose(
            &stats,
            &host(),
            ReportOptions {
                per_worker: false,
                histogram: true,
            },
        );
        assert!(text.contains("Total samples: 0"));
        assert!(text.contains("no latency data collected"));
        assert!(!text.contains("Latency Distribution:"));
    }

    #[test]
    fn test_render_compact() {
        let base = Instant::now();
        let stats = RunStatistics::from_results(4, &[result(0, 40, 30, 0, 2000, base)]);
        assert_eq!(render_compact(&stats), "4 20.00 75%");
    }

    #[test]
    fn test_summary_serializes_derived_fields() {
        let base = Instant::now();
        let stats = RunStatistics::from_results(1, &[result(0, 10, 10, 0, 1000, base)]);
        let summary = stats.summary(OperationKind::Search, &host());
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["operation"], "search");
        assert_eq!(json["total_requests"], 10);
        assert_eq!(json["success_rate"], 100);
        assert_eq!(json["wall_clock"], 1.0);
        assert_eq!(json["host"]["cpus"], 8);

        let empty = RunStatistics::from_results(1, &[]).summary(OperationKind::Add, &host());
        let json = serde_json::to_value(&empty).unwrap();
        assert!(json["throughput"].is_null());
        assert!(json["success_rate"].is_null());
    }
}
