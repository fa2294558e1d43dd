use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::api::{json_body, non_empty, str_field, with_id, ApiResult, ListQuery};
use crate::db::Filter;
use crate::http::{ApiError, ApiResponse, AppState};
use crate::models::{Service, Stored, SERVICE_CATEGORIES};
use crate::repository::by_order_then_newest;
use crate::validation::Validator;

fn not_found() -> ApiError {
    ApiError::NotFound("Service not found".into())
}

/// GET /api/services
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Value>> {
    let mut filter = Filter::new().eq("isActive", true);
    if let Some(category) = non_empty(&query.category) {
        filter = filter.eq("category", category);
    }

    let mut services = state.repo::<Service>().find(&filter).await?;
    by_order_then_newest(&mut services, |s| s.order);
    let data = services.iter().map(with_id).collect::<Result<Vec<_>, _>>()?;
    Ok(ApiResponse::ok("Services retrieved successfully", data))
}

/// GET /api/services/{slug}
pub async fn by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Stored<Service>> {
    let filter = Filter::new().eq("slug", slug).eq("isActive", true);
    let service = state
        .repo::<Service>()
        .find_one(&filter)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Service retrieved successfully", service))
}

/// GET /api/admin/services
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Vec<Stored<Service>>> {
    let mut services = state.repo::<Service>().find(&Filter::new()).await?;
    by_order_then_newest(&mut services, |s| s.order);
    Ok(ApiResponse::ok("Services retrieved successfully", services))
}

/// POST /api/admin/services
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<Service>> {
    let body = json_body(payload)?;
    Validator::new()
        .required("title", str_field(&body, "title"), "Title is required")
        .required("description", str_field(&body, "description"), "Description is required")
        .required("slug", str_field(&body, "slug"), "Slug is required")
        .one_of(
            "category",
            str_field(&body, "category"),
            SERVICE_CATEGORIES,
            "Category must be igaming or crypto",
        )
        .finish()
        .map_err(ApiError::Validation)?;

    let service = state.repo::<Service>().create(body).await?;
    Ok(ApiResponse::created("Service created successfully", service))
}

/// PUT /api/admin/services/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<Service>> {
    let body = json_body(payload)?;
    let service = state
        .repo::<Service>()
        .update(&id, body)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Service updated successfully", service))
}

/// DELETE /api/admin/services/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    state
        .repo::<Service>()
        .delete(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::message(StatusCode::OK, "Service deleted successfully"))
}
