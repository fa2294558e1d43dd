//! Metrics collection and exposition.
//!
//! # Metrics
//! - `site_requests_total` (counter): requests by method, path, status
//! - `site_request_duration_seconds` (histogram): latency distribution
//! - `site_db_connection_state` (gauge): 0=disconnected, 1=connected, 2=connecting, 3=disconnecting
//! - `site_db_retry_count` (gauge): consecutive failed connection attempts
//! - `site_db_connect_attempts_total` (counter): attempts by outcome
//!
//! # Design Decisions
//! - Paths are recorded as matched routes, not raw URIs, to bound cardinality
//! - Without an installed exporter every call is a cheap no-op

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::db::ConnectionState;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, path: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "site_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "site_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_connection_state(state: ConnectionState) {
    gauge!("site_db_connection_state").set(state as u8 as f64);
}

pub fn record_retry_count(count: u32) {
    gauge!("site_db_retry_count").set(count as f64);
}

pub fn record_connect_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("site_db_connect_attempts_total", "outcome" => outcome).increment(1);
}

/// Middleware recording count and latency for every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_request(&method, &path, response.status().as_u16(), start);
    response
}
