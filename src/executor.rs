//! Request execution.
//!
//! The dispatcher drives work through the [`RequestExecutor`] trait: one
//! call per sequence number, returning an [`Outcome`] no matter what went
//! wrong. [`HttpExecutor`] is the reqwest-backed implementation used by
//! the binary; tests substitute controlled fakes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::errors::ErrorCategory;
use crate::metrics::REQUEST_ERRORS_BY_CATEGORY;

/// Result of one executed work item.
///
/// Either an HTTP status code or a transport-level failure, always paired
/// with the elapsed duration (measured even on failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Response status, or None when no response was received at all.
    pub status: Option<u16>,

    /// Time from sending the request to the response being fully drained
    /// (or to the failure).
    pub duration: Duration,
}

impl Outcome {
    /// Histogram key for outcomes without a status code. No real HTTP
    /// status is 0, so transport failures never collide with responses.
    pub const NO_STATUS: u16 = 0;

    pub fn with_status(status: u16, duration: Duration) -> Self {
        Self {
            status: Some(status),
            duration,
        }
    }

    pub fn transport_failure(duration: Duration) -> Self {
        Self {
            status: None,
            duration,
        }
    }

    /// Success means a response was received and its status is below 400.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(code) if code < 400)
    }

    /// Key under which this outcome lands in the status histogram.
    pub fn status_key(&self) -> u16 {
        self.status.unwrap_or(Self::NO_STATUS)
    }
}

/// One unit of work, as seen by the dispatcher.
///
/// Implementations must not panic past outcome reporting: every failure
/// mode is represented as a failed [`Outcome`], never as a crash that
/// escapes the worker.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Executes the work item with the given sequence number (1-based,
    /// unique per run) and reports its outcome.
    async fn execute_one(&self, sequence: u64) -> Outcome;

    /// Pre-run availability probe. A false return aborts the run before
    /// any work is dispatched.
    async fn health_check(&self) -> bool;
}

/// Settings for [`HttpExecutor`], derived from the harness `Config`.
#[derive(Debug, Clone)]
pub struct HttpExecutorConfig {
    pub target_url: String,
    pub health_url: String,
    pub request_type: String,
    pub json_payload: Option<String>,
}

/// Sends one HTTP request per work item against a single target URL.
///
/// The client is shared across all workers; per-request state is limited
/// to the correlation header derived from the sequence number.
pub struct HttpExecutor {
    client: reqwest::Client,
    config: HttpExecutorConfig,
}

impl HttpExecutor {
    pub fn new(client: reqwest::Client, config: HttpExecutorConfig) -> Self {
        Self { client, config }
    }

    fn build_request(&self, sequence: u64) -> reqwest::RequestBuilder {
        let request = match self.config.request_type.as_str() {
            "GET" => self.client.get(&self.config.target_url),
            "POST" => self.client.post(&self.config.target_url),
            "PUT" => self.client.put(&self.config.target_url),
            "PATCH" => self.client.patch(&self.config.target_url),
            "DELETE" => self.client.delete(&self.config.target_url),
            other => {
                error!(
                    request_type = %other,
                    "Unsupported request type, falling back to GET"
                );
                self.client.get(&self.config.target_url)
            }
        };

        let request = request.header("X-Request-ID", format!("load-harness-{}", sequence));

        if let Some(ref payload) = self.config.json_payload {
            request
                .header("Content-Type", "application/json")
                .body(payload.clone())
        } else {
            request
        }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute_one(&self, sequence: u64) -> Outcome {
        let start = Instant::now();

        match self.build_request(sequence).send().await {
            Ok(mut response) => {
                let status = response.status().as_u16();

                // Consume the body in chunks without buffering it; at high
                // concurrency unconsumed bodies accumulate until OOM.
                while let Ok(Some(_chunk)) = response.chunk().await {}

                let duration = start.elapsed();

                if let Some(category) = ErrorCategory::from_status_code(status) {
                    REQUEST_ERRORS_BY_CATEGORY
                        .with_label_values(&[category.label()])
                        .inc();
                }

                debug!(
                    sequence = sequence,
                    status_code = status,
                    duration_ms = duration.as_millis() as u64,
                    "Request completed"
                );

                Outcome::with_status(status, duration)
            }
            Err(e) => {
                let duration = start.elapsed();
                let category = ErrorCategory::from_reqwest_error(&e);
                REQUEST_ERRORS_BY_CATEGORY
                    .with_label_values(&[category.label()])
                    .inc();

                error!(
                    sequence = sequence,
                    error = %e,
                    error_category = category.label(),
                    "Request failed"
                );

                Outcome::transport_failure(duration)
            }
        }
    }

    async fn health_check(&self) -> bool {
        info!(url = %self.config.health_url, "Checking target availability");

        match self.client.get(&self.config.health_url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                info!("Target is available");
                true
            }
            Ok(response) => {
                error!(
                    status_code = response.status().as_u16(),
                    "Health check returned non-OK status"
                );
                false
            }
            Err(e) => {
                error!(error = %e, "Target is unreachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_below_400_is_success() {
        let outcome = Outcome::with_status(200, Duration::from_millis(1));
        assert!(outcome.is_success());
        let outcome = Outcome::with_status(399, Duration::from_millis(1));
        assert!(outcome.is_success());
    }

    #[test]
    fn error_statuses_and_transport_failures_are_failures() {
        assert!(!Outcome::with_status(400, Duration::from_millis(1)).is_success());
        assert!(!Outcome::with_status(500, Duration::from_millis(1)).is_success());
        assert!(!Outcome::transport_failure(Duration::from_millis(1)).is_success());
    }

    #[test]
    fn transport_failures_use_the_sentinel_key() {
        let outcome = Outcome::transport_failure(Duration::from_millis(1));
        assert_eq!(outcome.status_key(), Outcome::NO_STATUS);

        let outcome = Outcome::with_status(502, Duration::from_millis(1));
        assert_eq!(outcome.status_key(), 502);
    }
}
