//! Connection gate behaviour through the full router.

use axum::http::StatusCode;
use std::time::Duration;
use tokio::time::Instant;

use site_backend::config::validation::validate_config;
use site_backend::db::ConnectionState;

mod common;

use common::{app, get, memory_connector, test_config, TEST_URI};

#[tokio::test(start_paused = true)]
async fn test_health_bypasses_gate_while_disconnected() {
    let config = test_config(Some(TEST_URI));
    let (driver, connector) = memory_connector(&config);
    let router = app(config, connector.clone());

    for path in ["/health", "/api/health"] {
        let start = Instant::now();
        let (status, body) = get(&router, path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Server is running");
        assert_eq!(body["database"], "disconnected");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
    assert_eq!(driver.connect_attempts(), 0);
    assert_eq!(connector.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_gate_times_out_with_retry_envelope() {
    let config = test_config(Some(TEST_URI));
    let (driver, connector) = memory_connector(&config);
    driver.set_reachable(false);
    let router = app(config, connector);

    let start = Instant::now();
    let (status, body) = get(&router, "/api/services").await;

    assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Database connection unavailable. Please try again in a moment."
    );
    assert_eq!(body["error"], "Database connection timeout (state: disconnected)");
    assert_eq!(body["retry"], true);
    assert_eq!(driver.connect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_gate_times_out_without_uri() {
    let config = test_config(None);
    let (driver, connector) = memory_connector(&config);
    let router = app(config, connector);

    let (status, body) = get(&router, "/api/blogs").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["retry"], true);
    assert_eq!(driver.connect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connected_requests_pass_straight_through() {
    let config = test_config(Some(TEST_URI));
    let (_, connector) = memory_connector(&config);
    connector.connect().await.unwrap();
    let router = app(config, connector);

    let start = Instant::now();
    let (status, body) = get(&router, "/api/services").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_gate_releases_when_connection_arrives() {
    let mut config = test_config(Some(TEST_URI));
    config.database.gate_timeout_ms = 10_000;
    let (driver, connector) = memory_connector(&config);
    driver.set_reachable(false);
    let router = app(config, connector);

    let start = Instant::now();
    let request = {
        let router = router.clone();
        tokio::spawn(async move { get(&router, "/api/products").await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    driver.set_reachable(true);

    let (status, _) = request.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    // The wait's own attempt failed at t=0; the 5s backoff retry succeeds.
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_route_is_gated_then_404() {
    let config = test_config(Some(TEST_URI));
    let (_, connector) = memory_connector(&config);
    connector.connect().await.unwrap();
    let router = app(config, connector);

    let (status, body) = get(&router, "/api/nope?x=1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route /api/nope?x=1 not found");
}

#[tokio::test(start_paused = true)]
async fn test_gate_envelope_arrives_before_request_timeout() {
    let mut config = test_config(Some(TEST_URI));
    config.server.request_timeout_secs = 3;
    assert!(validate_config(&config).is_ok());
    let (driver, connector) = memory_connector(&config);
    driver.set_reachable(false);
    let router = app(config, connector);

    let start = Instant::now();
    let (status, body) = get(&router, "/api/services").await;
    assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["retry"], true);
}

#[test]
fn test_gate_longer_than_request_timeout_is_rejected() {
    let mut config = test_config(Some(TEST_URI));
    config.server.request_timeout_secs = 3;
    config.database.gate_timeout_ms = 5_000;

    let errors = validate_config(&config).unwrap_err();
    assert!(errors.iter().any(|e| e.field == "database.gate_timeout_ms"));
}
