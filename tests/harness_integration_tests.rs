//! End-to-end runs: real dispatcher, real HTTP executor, mock target.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use load_harness::config::RunConfig;
use load_harness::dispatcher;
use load_harness::errors::HarnessError;
use load_harness::executor::{HttpExecutor, HttpExecutorConfig, RequestExecutor};
use load_harness::report::RunSummary;

async fn mock_health(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

fn executor_for(server_uri: &str) -> Arc<dyn RequestExecutor> {
    let config = HttpExecutorConfig {
        target_url: format!("{}/work", server_uri),
        health_url: format!("{}/health", server_uri),
        request_type: "POST".to_string(),
        json_payload: Some(r#"{"title":"generated"}"#.to_string()),
    };
    Arc::new(HttpExecutor::new(reqwest::Client::new(), config))
}

#[tokio::test]
async fn fifty_successful_requests_across_ten_workers() {
    let server = MockServer::start().await;
    mock_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/work"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(10)))
        .expect(50)
        .mount(&server)
        .await;

    let config = RunConfig::new(50, 10, Duration::from_secs(5)).unwrap();
    let stats = dispatcher::run(&config, executor_for(&server.uri()), None)
        .await
        .unwrap();

    assert_eq!(stats.completed, 50);
    assert_eq!(stats.succeeded, 50);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.status_counts[&200], 50);
    assert!(stats.elapsed() > Duration::ZERO);
    assert!(stats.min_duration >= Duration::from_millis(10));
    assert!(stats.min_duration <= stats.max_duration);

    let summary = RunSummary::from_stats(&stats);
    assert!(summary.requests_per_sec > 0.0);
    assert_eq!(summary.success_rate, 100.0);
    assert!(summary.latency.is_some());
}

#[tokio::test]
async fn a_run_of_pure_failures_still_completes_with_full_statistics() {
    let server = MockServer::start().await;
    mock_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/work"))
        .respond_with(ResponseTemplate::new(500))
        .expect(20)
        .mount(&server)
        .await;

    let config = RunConfig::new(20, 4, Duration::from_secs(5)).unwrap();
    let stats = dispatcher::run(&config, executor_for(&server.uri()), None)
        .await
        .unwrap();

    assert_eq!(stats.completed, 20);
    assert_eq!(stats.succeeded, 0);
    assert_eq!(stats.failed, 20);
    assert_eq!(stats.status_counts[&500], 20);

    let summary = RunSummary::from_stats(&stats);
    assert_eq!(summary.failure_rate, 100.0);
    let rendered = summary.render();
    assert!(rendered.contains("500: 20"));
}

#[tokio::test]
async fn unhealthy_target_aborts_before_any_request_is_sent() {
    let server = MockServer::start().await;
    mock_health(&server, 503).await;
    Mock::given(method("POST"))
        .and(path("/work"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = RunConfig::new(100, 10, Duration::from_secs(5)).unwrap();
    let result = dispatcher::run(&config, executor_for(&server.uri()), None).await;

    assert!(matches!(result, Err(HarnessError::HealthCheckFailed)));
}
