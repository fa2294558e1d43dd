use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::api::{json_body, non_empty, str_field, with_id, ApiResult, ListQuery};
use crate::db::Filter;
use crate::http::{ApiError, ApiResponse, AppState};
use crate::models::{Product, Stored};
use crate::repository::by_order_then_newest;
use crate::validation::Validator;

fn not_found() -> ApiError {
    ApiError::NotFound("Product not found".into())
}

async fn active_products(state: &AppState, filter: Filter) -> Result<Vec<Value>, ApiError> {
    let mut products = state.repo::<Product>().find(&filter.eq("isActive", true)).await?;
    by_order_then_newest(&mut products, |p| p.order);
    products.iter().map(with_id).collect()
}

/// GET /api/products
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Value>> {
    let mut filter = Filter::new();
    if let Some(category) = non_empty(&query.category) {
        filter = filter.eq("category", category);
    }
    if query.featured.as_deref() == Some("true") {
        filter = filter.eq("featured", true);
    }

    let data = active_products(&state, filter).await?;
    Ok(ApiResponse::ok("Products retrieved successfully", data))
}

/// GET /api/products/featured
pub async fn featured(State(state): State<AppState>) -> ApiResult<Vec<Value>> {
    let data = active_products(&state, Filter::new().eq("featured", true)).await?;
    Ok(ApiResponse::ok("Featured products retrieved successfully", data))
}

/// GET /api/products/{id}
pub async fn by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Stored<Product>> {
    let product = state
        .repo::<Product>()
        .get(&id)
        .await?
        .filter(|p| p.inner.is_active)
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Product retrieved successfully", product))
}

/// GET /api/admin/products
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Vec<Stored<Product>>> {
    let mut products = state.repo::<Product>().find(&Filter::new()).await?;
    by_order_then_newest(&mut products, |p| p.order);
    Ok(ApiResponse::ok("Products retrieved successfully", products))
}

/// POST /api/admin/products
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<Product>> {
    let body = json_body(payload)?;
    Validator::new()
        .required("name", str_field(&body, "name"), "Product name is required")
        .required("description", str_field(&body, "description"), "Description is required")
        .finish()
        .map_err(ApiError::Validation)?;

    let product = state.repo::<Product>().create(body).await?;
    Ok(ApiResponse::created("Product created successfully", product))
}

/// PUT /api/admin/products/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<Product>> {
    let body = json_body(payload)?;
    let product = state
        .repo::<Product>()
        .update(&id, body)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Product updated successfully", product))
}

/// DELETE /api/admin/products/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    state
        .repo::<Product>()
        .delete(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::message(StatusCode::OK, "Product deleted successfully"))
}
