//! Error taxonomy for the harness.
//!
//! Two kinds of failure exist here. Fatal errors (`HarnessError`) abort a
//! run before any work is dispatched: bad configuration, a failed health
//! gate, or a client that cannot be built. Per-request failures are never
//! errors at all — they are absorbed into the run statistics as failed
//! outcomes. `ErrorCategory` classifies those per-request failures for
//! structured log fields and metric labels.

use thiserror::Error;

/// Fatal errors that abort a run before any requests are dispatched.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration was missing or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pre-run health gate failed; no work was dispatched.
    #[error("health check failed: target did not report healthy")]
    HealthCheckFailed,

    /// The shared HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Categories of per-request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP 4xx errors (client errors)
    ClientError,

    /// HTTP 5xx errors (server errors)
    ServerError,

    /// Network connectivity errors (DNS, connection refused, etc.)
    NetworkError,

    /// Request timeout errors
    TimeoutError,

    /// TLS certificate errors
    TlsError,

    /// Other/unknown errors
    OtherError,
}

impl ErrorCategory {
    /// Categorize an HTTP status code, or None if the status is not an
    /// error (below 400).
    pub fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            0..=399 => None,
            400..=499 => Some(ErrorCategory::ClientError),
            500..=599 => Some(ErrorCategory::ServerError),
            _ => Some(ErrorCategory::OtherError),
        }
    }

    /// Categorize a transport-level reqwest error.
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            ErrorCategory::TimeoutError
        } else if error.is_connect() || error.is_request() {
            ErrorCategory::NetworkError
        } else if error.is_body() || error.is_decode() {
            // Body/decode failures mid-response are network-shaped
            ErrorCategory::NetworkError
        } else {
            let error_msg = error.to_string().to_lowercase();

            if error_msg.contains("certificate")
                || error_msg.contains("tls")
                || error_msg.contains("ssl")
            {
                ErrorCategory::TlsError
            } else if error_msg.contains("timeout") {
                ErrorCategory::TimeoutError
            } else if error_msg.contains("dns")
                || error_msg.contains("resolve")
                || error_msg.contains("connect")
            {
                ErrorCategory::NetworkError
            } else {
                ErrorCategory::OtherError
            }
        }
    }

    /// Metric label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "client_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::TimeoutError => "timeout_error",
            ErrorCategory::TlsError => "tls_error",
            ErrorCategory::OtherError => "other_error",
        }
    }
}
