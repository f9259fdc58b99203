use std::process;
use std::sync::{Arc, Mutex};

use load_harness::client::build_client;
use load_harness::config::{Config, ReportFormat};
use load_harness::dispatcher;
use load_harness::executor::HttpExecutor;
use load_harness::metrics::{gather_metrics_string, register_metrics, start_metrics_server};
use load_harness::report::RunSummary;

/// Prints helpful configuration documentation.
fn print_config_help() {
    eprintln!("Required environment variables:");
    eprintln!(
        "  TARGET_URL          - The URL to load test (must start with http:// or https://)"
    );
    eprintln!();
    eprintln!("Optional environment variables:");
    eprintln!("  TOTAL_REQUESTS      - Total number of requests to send (default: 2000)");
    eprintln!("  MAX_CONCURRENCY     - Max requests in flight at once (default: 1000)");
    eprintln!("  REQUEST_TIMEOUT     - Per-request timeout: 500ms, 30s, 2m (default: 30s)");
    eprintln!("  REQUEST_TYPE        - HTTP method: GET, POST, PUT, PATCH, DELETE (default: POST)");
    eprintln!("  SEND_JSON           - Send JSON payload: true or false (default: false)");
    eprintln!("  JSON_PAYLOAD        - JSON body (required if SEND_JSON=true)");
    eprintln!("  AUTH_TOKEN          - Authorization header value, e.g. 'Bearer ...'");
    eprintln!("  HEALTH_ENDPOINT     - Health check path on the target host (default: /health)");
    eprintln!("  PROGRESS_INTERVAL   - Log progress every Nth request, 0 disables (default: 10)");
    eprintln!("  SKIP_TLS_VERIFY     - Skip TLS certificate verification (default: false)");
    eprintln!("  METRICS_PORT        - Prometheus scrape port (default: 9090)");
    eprintln!("  METRIC_NAMESPACE    - Prometheus metric namespace (default: load_harness)");
    eprintln!("  REPORT_FORMAT       - Final report format: text or json (default: text)");
    eprintln!("  LOG_FORMAT          - Log output format: text or json (default: text)");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();
    register_metrics()?;

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}\n", e);
            print_config_help();
            process::exit(1);
        }
    };

    let client = build_client(&config.to_client_config())?;
    config.print_summary();

    // Expose metrics for the duration of the run.
    let registry = Arc::new(Mutex::new(prometheus::default_registry().clone()));
    {
        let registry = registry.clone();
        let port = config.metrics_port;
        tokio::spawn(async move {
            start_metrics_server(port, registry).await;
        });
    }

    let executor = Arc::new(HttpExecutor::new(client, config.to_executor_config()));

    let stats = match dispatcher::run(&config.run, executor, None).await {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Run aborted: {}", e);
            process::exit(1);
        }
    };

    let summary = RunSummary::from_stats(&stats);
    match config.report_format {
        ReportFormat::Text => println!("\n{}", summary.render()),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    println!("\n--- FINAL METRICS ---\n{}", gather_metrics_string(&registry));
    println!("--- END OF FINAL METRICS ---");

    Ok(())
}
