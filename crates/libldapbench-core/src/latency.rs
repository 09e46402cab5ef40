//! Per-request latency recording

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// Lowest trackable latency in microseconds
const LOWEST_US: u64 = 1;
/// Highest trackable latency in microseconds (60 seconds)
const HIGHEST_US: u64 = 60_000_000;
const SIGFIG: u8 = 3;
/// Rows shown in the latency distribution; adjacent buckets are grouped to fit
pub const DISTRIBUTION_ROWS: usize = 10;

/// Latency histogram owned by a single worker
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    inner: Histogram<u64>,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyHistogram {
    pub fn new() -> Self {
        let inner = Histogram::new_with_bounds(LOWEST_US, HIGHEST_US, SIGFIG)
            .expect("constant histogram bounds are valid");
        Self { inner }
    }

    /// Record one request latency; values beyond the bounds are clamped
    pub fn record(&mut self, latency: Duration) {
        let us = (latency.as_micros() as u64).clamp(LOWEST_US, HIGHEST_US);
        let _ = self.inner.record(us);
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Fold another worker's samples into this one
    pub fn merge(&mut self, other: &LatencyHistogram) {
        let _ = self.inner.add(&other.inner);
    }

    pub fn percentiles(&self) -> LatencyPercentiles {
        if self.inner.is_empty() {
            return LatencyPercentiles::default();
        }
        LatencyPercentiles {
            samples: self.inner.len(),
            p50_us: self.inner.value_at_percentile(50.0),
            p75_us: self.inner.value_at_percentile(75.0),
            p90_us: self.inner.value_at_percentile(90.0),
            p95_us: self.inner.value_at_percentile(95.0),
            p99_us: self.inner.value_at_percentile(99.0),
            p999_us: self.inner.value_at_percentile(99.9),
            max_us: self.inner.max(),
        }
    }

    /// Recorded buckets in ascending order, grouped into at most `max_rows`
    pub fn distribution(&self, max_rows: usize) -> Vec<LatencyBucket> {
        let buckets: Vec<LatencyBucket> = self
            .inner
            .iter_recorded()
            .map(|v| {
                let value = v.value_iterated_to();
                LatencyBucket {
                    low_us: self.inner.lowest_equivalent(value),
                    high_us: self.inner.highest_equivalent(value),
                    count: v.count_at_value(),
                }
            })
            .collect();

        if max_rows == 0 || buckets.len() <= max_rows {
            return buckets;
        }
        let per_row = (buckets.len() + max_rows - 1) / max_rows;
        buckets
            .chunks(per_row)
            .map(|chunk| LatencyBucket {
                low_us: chunk[0].low_us,
                high_us: chunk[chunk.len() - 1].high_us,
                count: chunk.iter().map(|b| b.count).sum(),
            })
            .collect()
    }
}

/// Requests whose latency fell in `low_us..=high_us`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyBucket {
    pub low_us: u64,
    pub high_us: u64,
    pub count: u64,
}

/// Latency percentiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub samples: u64,
    pub p50_us: u64,
    pub p75_us: u64,
    pub p90_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub p999_us: u64,
    pub max_us: u64,
}

impl LatencyPercentiles {
    /// (label, value) pairs in report order
    pub fn rows(&self) -> [(&'static str, u64); 7] {
        [
            ("p50", self.p50_us),
            ("p75", self.p75_us),
            ("p90", self.p90_us),
            ("p95", self.p95_us),
            ("p99", self.p99_us),
            ("p99.9", self.p999_us),
            ("max", self.max_us),
        ]
    }
}

/// Human-readable latency with a unit suited to its magnitude
pub fn format_latency(us: u64) -> String {
    if us >= 1_000_000 {
        format!("{:.2} s", us as f64 / 1_000_000.0)
    } else if us >= 1_000 {
        format!("{:.2} ms", us as f64 / 1_000.0)
    } else {
        format!("{} us", us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_histogram_has_zero_percentiles() {
        let hist = LatencyHistogram::new();
        assert!(hist.is_empty());
        assert_eq!(hist.percentiles(), LatencyPercentiles::default());
    }

    #[test]
    fn test_merge_combines_samples() {
        let mut a = LatencyHistogram::new();
        let mut b = LatencyHistogram::new();
        for ms in 1..=10 {
            a.record(Duration::from_millis(ms));
        }
        b.record(Duration::from_secs(2));

        a.merge(&b);
        let p = a.percentiles();
        assert_eq!(p.samples, 11);
        assert!(p.max_us >= 1_990_000);
        assert!(p.p50_us >= 4_990 && p.p50_us <= 6_010);
    }

    #[test]
    fn test_out_of_range_latency_is_clamped() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_nanos(10));
        hist.record(Duration::from_secs(600));
        assert_eq!(hist.len(), 2);
        assert!(hist.percentiles().max_us <= 60_100_000);
    }

    #[test]
    fn test_distribution_groups_into_rows() {
        let mut hist = LatencyHistogram::new();
        for ms in 1..=100 {
            hist.record(Duration::from_millis(ms));
        }

        let rows = hist.distribution(DISTRIBUTION_ROWS);
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|b| b.count == 10));
        assert!(rows.windows(2).all(|w| w[0].high_us < w[1].low_us));
        assert!(rows[0].low_us <= 1_000);
        assert!(rows[9].high_us >= 100_000);
    }

    #[test]
    fn test_distribution_keeps_few_buckets_apart() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_micros(250));
        hist.record(Duration::from_micros(250));
        hist.record(Duration::from_millis(3));

        let rows = hist.distribution(DISTRIBUTION_ROWS);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], LatencyBucket { low_us: 250, high_us: 250, count: 2 });
        assert_eq!(rows[1].count, 1);
        assert!(LatencyHistogram::new().distribution(DISTRIBUTION_ROWS).is_empty());
    }

    #[test]
    fn test_format_latency_units() {
        assert_eq!(format_latency(250), "250 us");
        assert_eq!(format_latency(2_500), "2.50 ms");
        assert_eq!(format_latency(3_000_000), "3.00 s");
    }
}
