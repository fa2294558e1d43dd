use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::{json_body, non_empty, str_field, ApiResult, ListQuery};
use crate::db::Filter;
use crate::http::{ApiError, ApiResponse, AppState};
use crate::models::{RequestDemo, Stored, DEMO_STATUSES};
use crate::repository::newest_first;
use crate::validation::Validator;

fn not_found() -> ApiError {
    ApiError::NotFound("Demo request not found".into())
}

/// POST /api/request-demo
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<RequestDemo>> {
    let body = json_body(payload)?;
    Validator::new()
        .required("name", str_field(&body, "name"), "Name is required")
        .email("email", str_field(&body, "email"), "Valid email is required")
        .finish()
        .map_err(ApiError::Validation)?;

    let request = state.repo::<RequestDemo>().create(body).await?;
    tracing::info!(id = %request.id, "Demo request submitted");
    Ok(ApiResponse::created("Demo request submitted successfully", request))
}

/// GET /api/admin/request-demos
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Stored<RequestDemo>>> {
    let mut filter = Filter::new();
    if let Some(status) = non_empty(&query.status) {
        filter = filter.eq("status", status);
    }
    let mut requests = state.repo::<RequestDemo>().find(&filter).await?;
    newest_first(&mut requests);
    Ok(ApiResponse::ok("Demo requests retrieved successfully", requests))
}

/// GET /api/admin/request-demos/{id}
pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Stored<RequestDemo>> {
    let request = state
        .repo::<RequestDemo>()
        .get(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Demo request retrieved successfully", request))
}

/// PUT /api/admin/request-demos/{id}; only `status` is updated.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<RequestDemo>> {
    let body = json_body(payload)?;
    let status = str_field(&body, "status");
    Validator::new()
        .one_of("status", status, DEMO_STATUSES, "Invalid status")
        .finish()
        .map_err(ApiError::Validation)?;

    let request = state
        .repo::<RequestDemo>()
        .update(&id, json!({ "status": status }))
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Demo request status updated successfully", request))
}

/// DELETE /api/admin/request-demos/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    state
        .repo::<RequestDemo>()
        .delete(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::message(StatusCode::OK, "Demo request deleted successfully"))
}
