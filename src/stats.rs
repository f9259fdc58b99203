//! Run statistics aggregation.
//!
//! A single `StatsAggregator` instance is shared by every worker in a run.
//! Each completed outcome is folded into running counters under one
//! exclusive critical section, so the counts, duration sum, min/max and
//! the status-code histogram always move together — a reader can never
//! observe a count increment without the matching histogram bump.
//! Individual samples are not retained; memory stays O(1) in the number
//! of requests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::executor::Outcome;

/// Mutable counters updated once per completed outcome.
///
/// `min_duration` starts at `Duration::MAX` so the first sample always
/// replaces it; `max_duration` starts at zero for the same reason.
#[derive(Debug)]
struct StatsInner {
    completed: u64,
    succeeded: u64,
    failed: u64,
    total_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
    status_counts: HashMap<u16, u64>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl StatsInner {
    fn new() -> Self {
        Self {
            completed: 0,
            succeeded: 0,
            failed: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            status_counts: HashMap::new(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Thread-safe accumulator for request outcomes.
///
/// `record` may be called concurrently from any number of workers; after
/// it returns, the update is visible to every subsequent call and to the
/// final snapshot.
pub struct StatsAggregator {
    inner: Mutex<StatsInner>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatsInner::new()),
        }
    }

    /// Marks the start of the run. Called once, before dispatch begins.
    pub fn mark_started(&self) {
        let mut stats = self.inner.lock().unwrap();
        stats.started_at = Some(Instant::now());
    }

    /// Marks the end of the run. Called once, after all workers join.
    pub fn mark_finished(&self) {
        let mut stats = self.inner.lock().unwrap();
        stats.finished_at = Some(Instant::now());
    }

    /// Folds one outcome into the running statistics.
    ///
    /// All related fields are updated under one lock acquisition so the
    /// aggregate state is never torn across fields.
    pub fn record(&self, outcome: &Outcome) {
        let mut stats = self.inner.lock().unwrap();

        stats.completed += 1;
        if outcome.is_success() {
            stats.succeeded += 1;
        } else {
            stats.failed += 1;
        }

        let duration = outcome.duration;
        stats.total_duration += duration;
        if duration < stats.min_duration {
            stats.min_duration = duration;
        }
        if duration > stats.max_duration {
            stats.max_duration = duration;
        }

        *stats.status_counts.entry(outcome.status_key()).or_insert(0) += 1;
    }

    /// Returns an owned, frozen copy of the current statistics.
    ///
    /// Called once after the join barrier, when no worker is still
    /// recording.
    pub fn snapshot(&self) -> RunStats {
        let stats = self.inner.lock().unwrap();
        RunStats {
            completed: stats.completed,
            succeeded: stats.succeeded,
            failed: stats.failed,
            total_duration: stats.total_duration,
            min_duration: stats.min_duration,
            max_duration: stats.max_duration,
            status_counts: stats.status_counts.clone(),
            started_at: stats.started_at,
            finished_at: stats.finished_at,
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen, read-only view of a run's statistics.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Total outcomes recorded.
    pub completed: u64,

    /// Outcomes with no transport error and a status below 400.
    pub succeeded: u64,

    /// Transport errors, timeouts, and error-range statuses.
    pub failed: u64,

    /// Sum of all observed durations.
    pub total_duration: Duration,

    /// Smallest observed duration (`Duration::MAX` if nothing completed).
    pub min_duration: Duration,

    /// Largest observed duration (zero if nothing completed).
    pub max_duration: Duration,

    /// Occurrences per status code; transport failures land under the
    /// sentinel key `Outcome::NO_STATUS`.
    pub status_counts: HashMap<u16, u64>,

    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl RunStats {
    /// Wall-clock time between the start and finish marks, or zero if the
    /// run never started or never finished.
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// Mean duration across all completed outcomes, or None if nothing
    /// completed.
    pub fn mean_duration(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        Some(self.total_duration / self.completed as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(status: u16, millis: u64) -> Outcome {
        Outcome::with_status(status, Duration::from_millis(millis))
    }

    #[test]
    fn classifies_success_and_failure() {
        let agg = StatsAggregator::new();
        agg.record(&ok(200, 10));
        agg.record(&ok(201, 10));
        agg.record(&ok(404, 10));
        agg.record(&ok(500, 10));
        agg.record(&Outcome::transport_failure(Duration::from_millis(10)));

        let stats = agg.snapshot();
        assert_eq!(stats.completed, 5);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.succeeded + stats.failed, stats.completed);
    }

    #[test]
    fn tracks_min_max_and_sum() {
        let agg = StatsAggregator::new();
        agg.record(&ok(200, 30));
        agg.record(&ok(200, 10));
        agg.record(&ok(200, 20));

        let stats = agg.snapshot();
        assert_eq!(stats.min_duration, Duration::from_millis(10));
        assert_eq!(stats.max_duration, Duration::from_millis(30));
        assert_eq!(stats.total_duration, Duration::from_millis(60));
        assert_eq!(stats.mean_duration(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn first_sample_replaces_initial_min_and_max() {
        let agg = StatsAggregator::new();
        agg.record(&ok(200, 42));

        let stats = agg.snapshot();
        assert_eq!(stats.min_duration, Duration::from_millis(42));
        assert_eq!(stats.max_duration, Duration::from_millis(42));
    }

    #[test]
    fn histogram_counts_sum_to_completed() {
        let agg = StatsAggregator::new();
        for _ in 0..3 {
            agg.record(&ok(200, 5));
        }
        for _ in 0..2 {
            agg.record(&ok(500, 5));
        }
        agg.record(&Outcome::transport_failure(Duration::from_millis(5)));

        let stats = agg.snapshot();
        let histogram_total: u64 = stats.status_counts.values().sum();
        assert_eq!(histogram_total, stats.completed);
        assert_eq!(stats.status_counts[&200], 3);
        assert_eq!(stats.status_counts[&500], 2);
        assert_eq!(stats.status_counts[&Outcome::NO_STATUS], 1);
    }

    #[test]
    fn transport_failures_are_distinct_from_real_statuses() {
        let agg = StatsAggregator::new();
        agg.record(&Outcome::transport_failure(Duration::from_millis(1)));
        agg.record(&ok(500, 1));

        let stats = agg.snapshot();
        assert_eq!(stats.status_counts.len(), 2);
        assert_eq!(stats.status_counts[&Outcome::NO_STATUS], 1);
        assert_eq!(stats.status_counts[&500], 1);
    }

    #[test]
    fn empty_snapshot_has_initial_bounds() {
        let stats = StatsAggregator::new().snapshot();
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.min_duration, Duration::MAX);
        assert_eq!(stats.max_duration, Duration::ZERO);
        assert_eq!(stats.mean_duration(), None);
        assert_eq!(stats.elapsed(), Duration::ZERO);
    }

    // 1000 concurrent records with a fixed duration must lose no updates:
    // the sum and count come out exact or the critical section is broken.
    #[test]
    fn concurrent_records_lose_no_updates() {
        use std::sync::Arc;

        for _ in 0..10 {
            let agg = Arc::new(StatsAggregator::new());
            let mut handles = Vec::new();

            for _ in 0..8 {
                let agg = Arc::clone(&agg);
                handles.push(std::thread::spawn(move || {
                    for _ in 0..125 {
                        agg.record(&Outcome::with_status(200, Duration::from_millis(100)));
                    }
                }));
            }
            for handle in handles {
                handle.join().unwrap();
            }

            let stats = agg.snapshot();
            assert_eq!(stats.completed, 1000);
            assert_eq!(stats.succeeded, 1000);
            assert_eq!(stats.total_duration, Duration::from_millis(100_000));
            assert_eq!(stats.status_counts[&200], 1000);
        }
    }
}
