use std::fmt;
use std::time::Duration;

/// Aggregate latency statistics over the measured phase of a run.
///
/// Percentiles are interpolated linearly across the sorted latency sequence
/// at ns precision and rendered in ms; `min`, `max` and `mean` are computed
/// over ms-truncated values.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    min_ms: u64,
    max_ms: u64,
    mean_ms: f64,
    p90: Duration,
    p95: Duration,
    p99: Duration,
}

impl LatencySummary {
    /// Computes the summary for a latency distribution.
    ///
    /// Returns `None` when no latencies were collected.
    #[must_use]
    pub fn from_latencies(latencies: &[Duration]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let mean_ms = sorted.iter().map(|d| d.as_millis() as f64).sum::<f64>()
            / sorted.len() as f64;

        Some(Self {
            min_ms: sorted[0].as_millis() as u64,
            max_ms: sorted[sorted.len() - 1].as_millis() as u64,
            mean_ms,
            p90: interpolate(&sorted, 90.0),
            p95: interpolate(&sorted, 95.0),
            p99: interpolate(&sorted, 99.0),
        })
    }

    /// Minimum latency in ms.
    #[must_use]
    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    /// Maximum latency in ms.
    #[must_use]
    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Arithmetic mean over ms-truncated latencies.
    #[must_use]
    pub fn mean_ms(&self) -> f64 {
        self.mean_ms
    }

    /// 90th percentile at ns precision.
    #[must_use]
    pub fn p90(&self) -> Duration {
        self.p90
    }

    /// 95th percentile at ns precision.
    #[must_use]
    pub fn p95(&self) -> Duration {
        self.p95
    }

    /// 99th percentile at ns precision.
    #[must_use]
    pub fn p99(&self) -> Duration {
        self.p99
    }

    /// The one-line aggregate summary, newline-terminated.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Min: {}ms, Max: {}ms, Average: {:.2}ms, P90: {}ms, P95: {}ms, P99: {}ms",
            self.min_ms,
            self.max_ms,
            self.mean_ms,
            self.p90.as_millis(),
            self.p95.as_millis(),
            self.p99.as_millis(),
        )
    }
}

/// Linear interpolation across a sorted latency sequence.
///
/// With `n` values the sequence spans `n - 1` buckets of `100 / (n - 1)`
/// percentile points each; the requested percentile lands in bucket
/// `floor` and is interpolated between its two bounding values in ns.
fn interpolate(sorted: &[Duration], percentile: f64) -> Duration {
    if sorted.len() == 1 {
        return sorted[0];
    }

    let stride = 100.0 / (sorted.len() - 1) as f64;
    let floor = (percentile * (sorted.len() - 1) as f64 / 100.0).floor() as usize;
    let frac = (percentile - stride * floor as f64) / stride;

    let y0 = sorted[floor];
    let y1 = sorted[floor + 1];
    let diff_ns = (y1 - y0).as_nanos() as f64;
    y0 + Duration::from_nanos((frac * diff_ns).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|&v| Duration::from_millis(v)).collect()
    }

    #[test]
    fn test_reference_distribution() {
        let summary = LatencySummary::from_latencies(&ms(&[10, 20, 30, 40, 50])).unwrap();
        assert_eq!(summary.min_ms(), 10);
        assert_eq!(summary.max_ms(), 50);
        assert!((summary.mean_ms() - 30.0).abs() < f64::EPSILON);
        assert_eq!(summary.p90(), Duration::from_millis(46));
        assert_eq!(summary.p95(), Duration::from_millis(48));
        // p99 interpolates to 49.6ms exactly; display truncates to 49ms.
        assert_eq!(summary.p99(), Duration::from_nanos(49_600_000));
        assert_eq!(
            summary.to_line(),
            "Min: 10ms, Max: 50ms, Average: 30.00ms, P90: 46ms, P95: 48ms, P99: 49ms\n"
        );
    }

    #[test]
    fn test_percentiles_are_monotonic() {
        let latencies = ms(&[12, 7, 93, 41, 5, 88, 60, 60, 3, 27]);
        let summary = LatencySummary::from_latencies(&latencies).unwrap();
        assert!(summary.p90() <= summary.p95());
        assert!(summary.p95() <= summary.p99());
        assert!(summary.p99().as_millis() as u64 <= summary.max_ms());
        assert!(summary.min_ms() as f64 <= summary.mean_ms());
        assert!(summary.mean_ms() <= summary.max_ms() as f64);
    }

    #[test]
    fn test_single_value_collapses_all_percentiles() {
        let summary = LatencySummary::from_latencies(&ms(&[17])).unwrap();
        assert_eq!(summary.p90(), Duration::from_millis(17));
        assert_eq!(summary.p95(), Duration::from_millis(17));
        assert_eq!(summary.p99(), Duration::from_millis(17));
        assert_eq!(summary.min_ms(), 17);
        assert_eq!(summary.max_ms(), 17);
    }

    #[test]
    fn test_empty_distribution_yields_none() {
        assert!(LatencySummary::from_latencies(&[]).is_none());
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let summary = LatencySummary::from_latencies(&ms(&[50, 10, 40, 20, 30])).unwrap();
        assert_eq!(summary.min_ms(), 10);
        assert_eq!(summary.p90(), Duration::from_millis(46));
    }
}
