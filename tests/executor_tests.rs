//! HTTP executor behavior against a mock server.

use std::time::Duration;

use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use load_harness::executor::{HttpExecutor, HttpExecutorConfig, Outcome, RequestExecutor};

fn executor_for(server_uri: &str, request_type: &str, payload: Option<&str>) -> HttpExecutor {
    let config = HttpExecutorConfig {
        target_url: format!("{}/work", server_uri),
        health_url: format!("{}/health", server_uri),
        request_type: request_type.to_string(),
        json_payload: payload.map(|p| p.to_string()),
    };
    HttpExecutor::new(reqwest::Client::new(), config)
}

#[tokio::test]
async fn captures_the_response_status_and_a_nonzero_duration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let executor = executor_for(&server.uri(), "GET", None);
    let outcome = executor.execute_one(1).await;

    assert_eq!(outcome.status, Some(200));
    assert!(outcome.is_success());
    assert!(outcome.duration > Duration::ZERO);
}

#[tokio::test]
async fn sends_json_payload_and_correlation_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/work"))
        .and(header("Content-Type", "application/json"))
        .and(header("X-Request-ID", "load-harness-7"))
        .and(body_string(r#"{"title":"task"}"#))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server.uri(), "POST", Some(r#"{"title":"task"}"#));
    let outcome = executor.execute_one(7).await;

    assert_eq!(outcome.status, Some(201));
}

#[tokio::test]
async fn error_statuses_are_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let executor = executor_for(&server.uri(), "GET", None);
    let outcome = executor.execute_one(1).await;

    assert_eq!(outcome.status, Some(503));
    assert!(!outcome.is_success());
    assert_eq!(outcome.status_key(), 503);
}

#[tokio::test]
async fn unreachable_target_maps_to_a_transport_failure() {
    // Nothing listens on port 1.
    let executor = executor_for("http://127.0.0.1:1", "GET", None);
    let outcome = executor.execute_one(1).await;

    assert_eq!(outcome.status, None);
    assert_eq!(outcome.status_key(), Outcome::NO_STATUS);
    assert!(!outcome.is_success());
    assert!(outcome.duration > Duration::ZERO);
}

#[tokio::test]
async fn unsupported_request_type_falls_back_to_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server.uri(), "TRACE", None);
    let outcome = executor.execute_one(1).await;

    assert_eq!(outcome.status, Some(200));
}

#[tokio::test]
async fn health_check_passes_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let executor = executor_for(&server.uri(), "GET", None);
    assert!(executor.health_check().await);
}

#[tokio::test]
async fn health_check_fails_on_non_ok_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let executor = executor_for(&server.uri(), "GET", None);
    assert!(!executor.health_check().await);
}

#[tokio::test]
async fn health_check_fails_when_unreachable() {
    let executor = executor_for("http://127.0.0.1:1", "GET", None);
    assert!(!executor.health_check().await);
}
