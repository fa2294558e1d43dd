//! Shared helpers for integration tests.
#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use site_backend::config::SiteConfig;
use site_backend::db::{Connector, MemoryDriver};
use site_backend::http::{build_router, AppState};

pub const TEST_URI: &str = "memory://cluster0";

/// Config tuned for tests: short gate timeout, no rate limiting.
pub fn test_config(uri: Option<&str>) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.database.uri = uri.map(str::to_string);
    config.database.gate_timeout_ms = 2_000;
    config.rate_limit.enabled = false;
    config.auth.jwt_secret = "integration-secret".to_string();
    config
}

pub fn memory_connector(config: &SiteConfig) -> (Arc<MemoryDriver>, Connector) {
    let driver = Arc::new(MemoryDriver::new());
    let connector = Connector::new(driver.clone(), &config.database);
    (driver, connector)
}

pub fn app(config: SiteConfig, connector: Connector) -> Router {
    build_router(AppState::new(Arc::new(config), connector))
}

/// A router backed by a connected in-memory store.
pub async fn connected_app() -> (Router, Connector) {
    let config = test_config(Some(TEST_URI));
    let (_, connector) = memory_connector(&config);
    connector.connect().await.unwrap();
    (app(config, connector.clone()), connector)
}

pub async fn send(
    router: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(router: &Router, path: &str) -> (StatusCode, Value) {
    send(router, Method::GET, path, None, None).await
}

/// Let spawned tasks (event listeners, reconnects) run without advancing much time.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}
