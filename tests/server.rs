//! Live-socket tests: the server runs on an ephemeral port and is driven with reqwest.

use reqwest::StatusCode;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use site_backend::config::SiteConfig;
use site_backend::http::{AppState, HttpServer};
use site_backend::lifecycle::Shutdown;

mod common;

use common::{memory_connector, test_config, TEST_URI};

async fn start(config: SiteConfig) -> (SocketAddr, Shutdown, JoinHandle<()>) {
    let (_, connector) = memory_connector(&config);
    connector.connect().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(AppState::new(Arc::new(config), connector));

    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown, handle)
}

#[tokio::test]
async fn test_health_over_http() {
    let (addr, shutdown, handle) = start(test_config(Some(TEST_URI))).await;

    let res = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["database"], "connected");

    shutdown.trigger();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let mut config = test_config(Some(TEST_URI));
    config.rate_limit.enabled = true;
    config.rate_limit.max_requests = 2;
    let (addr, shutdown, handle) = start(config).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = client
            .get(format!("http://{}/api/services", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .get(format!("http://{}/api/services", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Too many requests from this IP, please try again later."
    );

    // Health is outside the limited prefix.
    let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    drop(client);

    shutdown.trigger();
    handle.await.unwrap();
}
