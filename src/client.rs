//! Shared HTTP client construction.
//!
//! One client is built per run and cloned into every worker; reqwest
//! clients are cheap handles over a shared connection pool, so this is
//! the read-only transport configuration all workers use concurrently.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};

use crate::errors::HarnessError;

/// Configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout, covering connect through body completion.
    pub request_timeout: Duration,

    /// Concurrency cap; sizes the idle connection pool so every worker
    /// can keep a connection warm.
    pub pool_size: usize,

    /// Skip TLS certificate verification.
    pub skip_tls_verify: bool,

    /// Value for a default Authorization header, e.g. "Bearer <token>".
    pub auth_token: Option<String>,
}

/// Builds the reqwest client all workers share.
///
/// The pool holds up to `pool_size` idle connections per host with a 90s
/// idle timeout, connects within 10s, and speaks HTTP/1 only — HTTP/2
/// would multiplex workers onto a handful of connections and measure the
/// target's stream scheduling rather than its request handling.
pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client, HarnessError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("load-harness/0.1"));
    if let Some(ref token) = config.auth_token {
        let value = HeaderValue::from_str(token).map_err(|_| {
            HarnessError::InvalidConfig(
                "AUTH_TOKEN contains characters not allowed in a header value".to_string(),
            )
        })?;
        headers.insert(AUTHORIZATION, value);
    }

    let mut builder = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .pool_max_idle_per_host(config.pool_size)
        .pool_idle_timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(10))
        .http1_only()
        .default_headers(headers);

    if config.skip_tls_verify {
        println!("WARNING: Skipping TLS certificate verification.");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}
