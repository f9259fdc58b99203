//! Post-run summary derivation and rendering.
//!
//! Consumes a frozen `RunStats` once, after the join barrier. Percentiles
//! are estimated from the mean with fixed multipliers rather than
//! computed from raw samples — the aggregator deliberately retains no
//! per-request durations, so memory stays bounded at any request volume.
//! The rendered table labels them as estimates.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::executor::Outcome;
use crate::stats::RunStats;

/// Response-time figures, present only when at least one item completed.
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,

    /// Estimated percentiles: P50 = mean, P90 = mean × 1.3,
    /// P95 = mean × 1.5, P99 = mean × 1.8.
    pub p50: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

/// One row of the status-code distribution.
#[derive(Debug, Clone, Serialize)]
pub struct StatusLine {
    /// Status code; `Outcome::NO_STATUS` for transport failures.
    pub code: u16,
    pub count: u64,
    pub percentage: f64,
}

/// Derived summary of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub requests_per_sec: f64,
    pub latency: Option<LatencySummary>,
    pub status_distribution: Vec<StatusLine>,
}

fn estimate_percentile(mean: Duration, factor: f64) -> Duration {
    Duration::from_nanos((mean.as_nanos() as f64 * factor).round() as u64)
}

impl RunSummary {
    /// Derives the summary from frozen statistics.
    ///
    /// With zero completed items every rate is 0.0 and the latency block
    /// is absent — never NaN, never a division by zero.
    pub fn from_stats(stats: &RunStats) -> Self {
        let elapsed = stats.elapsed();
        let completed = stats.completed;

        let (success_rate, failure_rate) = if completed > 0 {
            (
                stats.succeeded as f64 / completed as f64 * 100.0,
                stats.failed as f64 / completed as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        let requests_per_sec = if completed > 0 && elapsed.as_secs_f64() > 0.0 {
            completed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let latency = stats.mean_duration().map(|mean| LatencySummary {
            mean,
            min: stats.min_duration,
            max: stats.max_duration,
            p50: mean,
            p90: estimate_percentile(mean, 1.3),
            p95: estimate_percentile(mean, 1.5),
            p99: estimate_percentile(mean, 1.8),
        });

        let mut status_distribution: Vec<StatusLine> = stats
            .status_counts
            .iter()
            .map(|(&code, &count)| StatusLine {
                code,
                count,
                percentage: count as f64 / completed as f64 * 100.0,
            })
            .collect();
        status_distribution.sort_by_key(|line| line.code);

        Self {
            elapsed,
            completed,
            succeeded: stats.succeeded,
            failed: stats.failed,
            success_rate,
            failure_rate,
            requests_per_sec,
            latency,
            status_distribution,
        }
    }

    /// Renders the human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "===========================================");
        let _ = writeln!(out, "LOAD TEST RESULTS");
        let _ = writeln!(out, "===========================================");
        let _ = writeln!(out, "Total time: {:.2?}", self.elapsed);
        let _ = writeln!(out, "Total requests: {}", self.completed);

        if self.completed == 0 {
            let _ = writeln!(out, "No requests completed; nothing to report.");
            return out;
        }

        let _ = writeln!(
            out,
            "Successful: {} ({:.1}%)",
            self.succeeded, self.success_rate
        );
        let _ = writeln!(out, "Failed: {} ({:.1}%)", self.failed, self.failure_rate);
        let _ = writeln!(out, "Requests per second: {:.2}", self.requests_per_sec);

        if let Some(ref latency) = self.latency {
            let _ = writeln!(out, "Mean response time: {:.2?}", latency.mean);
            let _ = writeln!(out, "Min response time: {:.2?}", latency.min);
            let _ = writeln!(out, "Max response time: {:.2?}", latency.max);
        }

        let _ = writeln!(out, "\nStatus code distribution:");
        for line in &self.status_distribution {
            if line.code == Outcome::NO_STATUS {
                let _ = writeln!(
                    out,
                    "  error: {} ({:.1}%)",
                    line.count, line.percentage
                );
            } else {
                let _ = writeln!(
                    out,
                    "  {}: {} ({:.1}%)",
                    line.code, line.count, line.percentage
                );
            }
        }

        if let Some(ref latency) = self.latency {
            let _ = writeln!(out, "\nEstimated response time percentiles:");
            let _ = writeln!(out, "  P50 (median): ~{:.2?}", latency.p50);
            let _ = writeln!(out, "  P90: ~{:.2?}", latency.p90);
            let _ = writeln!(out, "  P95: ~{:.2?}", latency.p95);
            let _ = writeln!(out, "  P99: ~{:.2?}", latency.p99);
        }

        let _ = writeln!(out, "===========================================");
        out
    }
}
