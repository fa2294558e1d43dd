use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;

use crate::api::{json_body, ApiResult};
use crate::db::Filter;
use crate::http::{ApiResponse, AppState};
use crate::models::{Stored, WebsiteSettings};

/// GET /api/settings; the singleton is created with defaults on first read.
pub async fn get(State(state): State<AppState>) -> ApiResult<Stored<WebsiteSettings>> {
    let repo = state.repo::<WebsiteSettings>();
    let settings = match repo.find_one(&Filter::new()).await? {
        Some(settings) => settings,
        None => {
            tracing::info!("Creating default website settings");
            repo.insert(WebsiteSettings::default()).await?
        }
    };
    Ok(ApiResponse::ok("Settings retrieved successfully", settings))
}

/// PUT /api/admin/settings; merges into the singleton, creating it if absent.
pub async fn update(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<WebsiteSettings>> {
    let body = json_body(payload)?;
    let repo = state.repo::<WebsiteSettings>();

    let settings = match repo.find_one(&Filter::new()).await? {
        Some(current) => match repo.update(&current.id, body.clone()).await? {
            Some(updated) => updated,
            // Removed between read and write.
            None => repo.create(body).await?,
        },
        None => repo.create(body).await?,
    };
    Ok(ApiResponse::ok("Settings updated successfully", settings))
}
