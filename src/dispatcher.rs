//! Bounded work dispatch.
//!
//! Distributes a fixed number of work items across a pool of workers with
//! a hard cap on simultaneously in-flight executions. A feed task
//! publishes sequence numbers into a queue sized to hold the whole run,
//! then closes it; each worker repeatedly takes a concurrency permit,
//! pulls the next number, executes it, and folds the outcome into the
//! shared aggregator. The run returns only after every worker has
//! observed queue exhaustion and joined.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::errors::HarnessError;
use crate::executor::RequestExecutor;
use crate::metrics::{
    status_code_label, IN_FLIGHT_REQUESTS, REQUEST_DURATION_SECONDS, REQUEST_STATUS_CODES,
    REQUEST_TOTAL,
};
use crate::stats::{RunStats, StatsAggregator};

/// Advisory progress notification, emitted every K-th sequence number.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Worker that completed the item (1-based).
    pub worker_id: usize,

    /// Sequence number of the completed item.
    pub sequence: u64,

    /// Total items in the run.
    pub total: u64,

    /// Status of the completed item, None for transport failures.
    pub status: Option<u16>,

    /// Observed duration of the completed item.
    pub duration: Duration,
}

/// Callback invoked at the configured progress cadence. Purely advisory;
/// nothing in the run depends on it.
pub type ProgressHook = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Shared state handed to each worker.
struct WorkerContext {
    worker_id: usize,
    total: u64,
    progress_interval: u64,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<u64>>>,
    permits: Arc<Semaphore>,
    executor: Arc<dyn RequestExecutor>,
    stats: Arc<StatsAggregator>,
    progress: Option<ProgressHook>,
}

/// Executes a full run: health gate, dispatch, join, frozen statistics.
///
/// Exactly `config.total_requests` items are executed, each exactly once,
/// with at most `config.max_concurrency` in flight at any instant.
/// Individual failures are recorded and never abort the run; the only
/// error paths are the pre-run health gate and configuration problems
/// caught at config construction.
pub async fn run(
    config: &RunConfig,
    executor: Arc<dyn RequestExecutor>,
    progress: Option<ProgressHook>,
) -> Result<RunStats, HarnessError> {
    if !executor.health_check().await {
        return Err(HarnessError::HealthCheckFailed);
    }

    let stats = Arc::new(StatsAggregator::new());
    stats.mark_started();

    info!(
        total = config.total_requests,
        max_concurrency = config.max_concurrency,
        "Dispatch starting"
    );

    // Capacity covers the whole run so the feed never blocks on a slow
    // worker; dropping the sender closes the queue behind the last item.
    let (tx, rx) = mpsc::channel::<u64>(config.total_requests as usize);
    let queue = Arc::new(tokio::sync::Mutex::new(rx));
    let permits = Arc::new(Semaphore::new(config.max_concurrency));

    let total = config.total_requests;
    let feeder = tokio::spawn(async move {
        for sequence in 1..=total {
            if tx.send(sequence).await.is_err() {
                break;
            }
        }
    });

    let mut workers = Vec::with_capacity(config.max_concurrency);
    for worker_id in 1..=config.max_concurrency {
        let ctx = WorkerContext {
            worker_id,
            total,
            progress_interval: config.progress_interval,
            queue: Arc::clone(&queue),
            permits: Arc::clone(&permits),
            executor: Arc::clone(&executor),
            stats: Arc::clone(&stats),
            progress: progress.clone(),
        };
        workers.push(tokio::spawn(run_worker(ctx)));
    }

    // Join barrier: the run is over only when every worker has drained
    // its last in-flight execution.
    for handle in workers {
        if let Err(e) = handle.await {
            error!(error = %e, "Worker task failed to join");
        }
    }
    if let Err(e) = feeder.await {
        error!(error = %e, "Feed task failed to join");
    }

    stats.mark_finished();
    info!("All requests processed");

    Ok(stats.snapshot())
}

/// Worker loop: permit, pull, execute, release, record.
///
/// Exits when the queue is closed and drained — for a pool larger than
/// the run, surplus workers fall through here immediately.
async fn run_worker(ctx: WorkerContext) {
    debug!(worker_id = ctx.worker_id, "Worker starting");

    loop {
        let Ok(permit) = ctx.permits.acquire().await else {
            // The semaphore is never closed while workers run.
            break;
        };

        // Hold the queue lock only for the dequeue itself.
        let sequence = {
            let mut queue = ctx.queue.lock().await;
            queue.recv().await
        };
        let Some(sequence) = sequence else {
            break;
        };

        IN_FLIGHT_REQUESTS.inc();
        let outcome = ctx.executor.execute_one(sequence).await;
        IN_FLIGHT_REQUESTS.dec();
        drop(permit);

        REQUEST_TOTAL.inc();
        REQUEST_STATUS_CODES
            .with_label_values(&[status_code_label(outcome.status_key())])
            .inc();
        REQUEST_DURATION_SECONDS.observe(outcome.duration.as_secs_f64());

        ctx.stats.record(&outcome);

        if ctx.progress_interval > 0 && sequence % ctx.progress_interval == 0 {
            info!(
                worker_id = ctx.worker_id,
                sequence = sequence,
                total = ctx.total,
                status = outcome.status.unwrap_or(0),
                duration_ms = outcome.duration.as_millis() as u64,
                "Progress"
            );
            if let Some(ref hook) = ctx.progress {
                hook(&ProgressEvent {
                    worker_id: ctx.worker_id,
                    sequence,
                    total: ctx.total,
                    status: outcome.status,
                    duration: outcome.duration,
                });
            }
        }
    }

    debug!(worker_id = ctx.worker_id, "Worker finished");
}
