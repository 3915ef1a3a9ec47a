use std::time::Duration;

use chrono::{DateTime, Local, Utc};

/// CSV header for detailed per-request records.
pub const CSV_HEADER: &str = "StartTime,Duration\n";

/// One timed request: when the worker started it and how long it took.
///
/// Produced by the sample executor, moved to the load manager at sample
/// completion, and consumed once by the results writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleResult {
    /// Wall-clock instant the worker entered the request, UTC, ns precision.
    pub start_time: DateTime<Utc>,
    /// Observed latency at ns precision.
    pub latency: Duration,
}

impl SampleResult {
    /// Creates a record from a start instant and an observed latency.
    #[must_use]
    pub fn new(start_time: DateTime<Utc>, latency: Duration) -> Self {
        Self {
            start_time,
            latency,
        }
    }

    /// Renders the detailed-CSV row for this record, without a trailing
    /// newline. Start time is formatted in the system zone with microsecond
    /// precision; the duration as zero-padded `HH:MM:SS.ffffff`.
    #[must_use]
    pub fn csv_row(&self) -> String {
        format!(
            "{},{}",
            self.start_time
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.6f"),
            format_latency(self.latency)
        )
    }
}

fn format_latency(latency: Duration) -> String {
    let total_secs = latency.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:06}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        latency.subsec_micros()
    )
}
