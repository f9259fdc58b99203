//! Environment-driven configuration.
//!
//! Everything is read once at startup; nothing here is mutated during a
//! run. `RunConfig` carries the core dispatch parameters, `Config` the
//! full harness settings including the HTTP glue.

use std::env;
use std::time::Duration;

use crate::client::ClientConfig;
use crate::errors::HarnessError;
use crate::executor::HttpExecutorConfig;

/// Core parameters of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Total number of work items to execute. Always positive.
    pub total_requests: u64,

    /// Hard cap on simultaneously in-flight executions. Always positive;
    /// may exceed `total_requests`.
    pub max_concurrency: usize,

    /// Per-request execution bound. A timed-out request is an ordinary
    /// failed outcome, not a run-wide abort.
    pub request_timeout: Duration,

    /// Emit a progress event every K-th sequence number; 0 disables.
    /// Advisory only.
    pub progress_interval: u64,
}

impl RunConfig {
    /// Creates a validated run configuration with the default progress
    /// cadence (every 10th request).
    pub fn new(
        total_requests: u64,
        max_concurrency: usize,
        request_timeout: Duration,
    ) -> Result<Self, HarnessError> {
        if total_requests == 0 {
            return Err(HarnessError::InvalidConfig(
                "TOTAL_REQUESTS must be greater than 0".to_string(),
            ));
        }
        if max_concurrency == 0 {
            return Err(HarnessError::InvalidConfig(
                "MAX_CONCURRENCY must be greater than 0".to_string(),
            ));
        }
        if request_timeout.is_zero() {
            return Err(HarnessError::InvalidConfig(
                "REQUEST_TIMEOUT must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            total_requests,
            max_concurrency,
            request_timeout,
            progress_interval: 10,
        })
    }
}

/// How the final report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Full harness configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: String,
    pub health_url: String,
    pub request_type: String,
    pub json_payload: Option<String>,
    pub auth_token: Option<String>,
    pub run: RunConfig,
    pub skip_tls_verify: bool,
    pub metrics_port: u16,
    pub report_format: ReportFormat,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, HarnessError> {
        let target_url = env::var("TARGET_URL").map_err(|_| {
            HarnessError::InvalidConfig("TARGET_URL environment variable must be set".to_string())
        })?;
        if !target_url.starts_with("http://") && !target_url.starts_with("https://") {
            return Err(HarnessError::InvalidConfig(format!(
                "TARGET_URL must start with http:// or https://, got '{}'",
                target_url
            )));
        }

        let health_endpoint =
            env::var("HEALTH_ENDPOINT").unwrap_or_else(|_| "/health".to_string());
        let health_url = derive_health_url(&target_url, &health_endpoint)?;

        let request_type = env::var("REQUEST_TYPE").unwrap_or_else(|_| "POST".to_string());

        let send_json = env::var("SEND_JSON")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";
        let json_payload = if send_json {
            Some(env::var("JSON_PAYLOAD").map_err(|_| {
                HarnessError::InvalidConfig(
                    "JSON_PAYLOAD environment variable must be set when SEND_JSON=true"
                        .to_string(),
                )
            })?)
        } else {
            None
        };

        let auth_token = env::var("AUTH_TOKEN").ok();

        let total_requests = parse_env_number("TOTAL_REQUESTS", 2000)?;
        let max_concurrency = parse_env_number("MAX_CONCURRENCY", 1000)? as usize;

        let timeout_str = env::var("REQUEST_TIMEOUT").unwrap_or_else(|_| "30s".to_string());
        let request_timeout = parse_duration(&timeout_str).map_err(|e| {
            HarnessError::InvalidConfig(format!(
                "Invalid REQUEST_TIMEOUT format: '{}'. {}",
                timeout_str, e
            ))
        })?;

        let mut run = RunConfig::new(total_requests, max_concurrency, request_timeout)?;
        run.progress_interval = parse_env_number("PROGRESS_INTERVAL", 10)?;

        let skip_tls_verify = env::var("SKIP_TLS_VERIFY")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let metrics_port = parse_env_number("METRICS_PORT", 9090)? as u16;

        let report_format = match env::var("REPORT_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase()
            .as_str()
        {
            "text" => ReportFormat::Text,
            "json" => ReportFormat::Json,
            other => {
                return Err(HarnessError::InvalidConfig(format!(
                    "REPORT_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(Config {
            target_url,
            health_url,
            request_type,
            json_payload,
            auth_token,
            run,
            skip_tls_verify,
            metrics_port,
            report_format,
        })
    }

    /// Creates a ClientConfig from this Config.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.run.request_timeout,
            pool_size: self.run.max_concurrency,
            skip_tls_verify: self.skip_tls_verify,
            auth_token: self.auth_token.clone(),
        }
    }

    /// Creates an HttpExecutorConfig from this Config.
    pub fn to_executor_config(&self) -> HttpExecutorConfig {
        HttpExecutorConfig {
            target_url: self.target_url.clone(),
            health_url: self.health_url.clone(),
            request_type: self.request_type.clone(),
            json_payload: self.json_payload.clone(),
        }
    }

    /// Prints the effective configuration.
    pub fn print_summary(&self) {
        println!("Starting load harness:");
        println!("  Target URL: {}", self.target_url);
        println!("  Health URL: {}", self.health_url);
        println!("  Request type: {}", self.request_type);
        println!("  Total requests: {}", self.run.total_requests);
        println!("  Max concurrency: {}", self.run.max_concurrency);
        println!("  Request timeout: {:?}", self.run.request_timeout);
        println!("  Progress interval: {}", self.run.progress_interval);
        println!("  Skip TLS verify: {}", self.skip_tls_verify);
        println!(
            "  Authorization header: {}",
            if self.auth_token.is_some() {
                "set"
            } else {
                "not set"
            }
        );
    }
}

/// Replaces the path of `target_url` with the health endpoint, keeping
/// scheme, host, and port.
fn derive_health_url(target_url: &str, health_endpoint: &str) -> Result<String, HarnessError> {
    let mut url = reqwest::Url::parse(target_url)
        .map_err(|e| HarnessError::InvalidConfig(format!("Invalid TARGET_URL: {}", e)))?;
    url.set_path(health_endpoint);
    url.set_query(None);
    Ok(url.to_string())
}

fn parse_env_number(name: &str, default: u64) -> Result<u64, HarnessError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| {
            HarnessError::InvalidConfig(format!("{} must be a valid number, got '{}'", name, value))
        }),
        Err(_) => Ok(default),
    }
}

/// Parses a duration string in the format "500ms", "30s", "10m", "5h".
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Duration string cannot be empty".to_string());
    }

    let split_at = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("Missing duration unit in '{}'. Use 'ms', 's', 'm', or 'h'.", s))?;
    let (value_str, unit) = s.split_at(split_at);

    let value: u64 = value_str
        .parse()
        .map_err(|_| format!("Invalid numeric value in duration: '{}'", value_str))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "Unknown duration unit: '{}'. Use 'ms', 's', 'm', or 'h'.",
            unit
        )),
    }
}
