//! Connection gate.
//!
//! Holds each request until the document store is usable, or answers with a
//! retryable 500 once the wait times out. Health paths are never gated so
//! liveness probes keep working while the store is down.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

use crate::db::{ConnectionState, Connector};

pub const HEALTH_PATHS: &[&str] = &["/health", "/api/health"];

const UNAVAILABLE_MESSAGE: &str = "Database connection unavailable. Please try again in a moment.";

#[derive(Clone)]
pub struct DbGate {
    connector: Connector,
    timeout: Duration,
}

impl DbGate {
    pub fn new(connector: Connector, timeout: Duration) -> Self {
        Self { connector, timeout }
    }
}

#[derive(Serialize)]
struct GateTimeout {
    success: bool,
    message: &'static str,
    error: String,
    retry: bool,
}

fn state_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "connecting (timeout)",
        other => other.as_str(),
    }
}

pub async fn db_gate_middleware(State(gate): State<DbGate>, request: Request, next: Next) -> Response {
    if HEALTH_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let observed = gate.connector.state();
    if observed == ConnectionState::Connected {
        return next.run(request).await;
    }

    if gate.connector.wait_for_connection(gate.timeout).await {
        return next.run(request).await;
    }

    tracing::warn!(
        path = %request.uri().path(),
        state = %observed,
        timeout_ms = gate.timeout.as_millis() as u64,
        "Database unavailable; rejecting request"
    );
    let body = GateTimeout {
        success: false,
        message: UNAVAILABLE_MESSAGE,
        error: format!("Database connection timeout (state: {})", state_label(observed)),
        retry: true,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
