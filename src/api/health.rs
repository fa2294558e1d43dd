//! Liveness endpoint. Never gated, never touches the store.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::db::ConnectionState;
use crate::http::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
    pub database: ConnectionState,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        success: true,
        message: "Server is running",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        database: state.connector.state(),
    })
}
