//! Route table and handlers.
//!
//! Public content lives under `/api`, the admin surface under `/api/admin`
//! behind [`require_admin`]. Register and login are the only unauthenticated
//! admin routes.

pub mod admins;
pub mod blogs;
pub mod contacts;
pub mod demo_requests;
pub mod health;
pub mod products;
pub mod services;
pub mod settings;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::middleware::require_admin;
use crate::http::{ApiError, ApiResponse, AppState};
use crate::models::Stored;

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/me", get(admins::me))
        .route("/settings", put(settings::update))
        .route("/services", get(services::list_all).post(services::create))
        .route("/services/{id}", put(services::update).delete(services::delete))
        .route("/products", get(products::list_all).post(products::create))
        .route("/products/{id}", put(products::update).delete(products::delete))
        .route("/blogs", get(blogs::list_all).post(blogs::create))
        .route("/blogs/{id}", put(blogs::update).delete(blogs::delete))
        .route("/contacts", get(contacts::list_all))
        .route(
            "/contacts/{id}",
            get(contacts::get_one)
                .put(contacts::update_status)
                .delete(contacts::delete),
        )
        .route("/request-demos", get(demo_requests::list_all))
        .route(
            "/request-demos/{id}",
            get(demo_requests::get_one)
                .put(demo_requests::update_status)
                .delete(demo_requests::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route("/register", post(admins::register))
        .route("/login", post(admins::login));

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/settings", get(settings::get))
        .route("/services", get(services::list))
        .route("/services/{slug}", get(services::by_slug))
        .route("/products", get(products::list))
        .route("/products/featured", get(products::featured))
        .route("/products/{id}", get(products::by_id))
        .route("/blogs", get(blogs::list))
        .route("/blogs/{slug}", get(blogs::by_slug))
        .route("/contact", post(contacts::submit))
        .route("/request-demo", post(demo_requests::submit));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/admin", admin)
        .nest("/api", public)
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> Response {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_else(|| uri.path());
    ApiResponse::message(StatusCode::NOT_FOUND, format!("Route {} not found", path)).into_response()
}

pub(crate) type ApiResult<T = ()> = Result<ApiResponse<T>, ApiError>;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub featured: Option<String>,
    pub status: Option<String>,
}

/// Unwrap a JSON body, turning extractor rejections into the JSON error envelope.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(body) = payload?;
    Ok(body)
}

/// String field of a request body; missing or non-string values read as empty.
pub(crate) fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body.get(field).and_then(Value::as_str).unwrap_or("")
}

/// Serialize a stored document and add an `id` alias for `_id`.
pub(crate) fn with_id<M: Serialize>(stored: &Stored<M>) -> Result<Value, ApiError> {
    let mut value = serde_json::to_value(stored)?;
    if let Value::Object(map) = &mut value {
        map.insert("id".to_string(), Value::String(stored.id.clone()));
    }
    Ok(value)
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
