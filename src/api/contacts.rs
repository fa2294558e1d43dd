use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::{json_body, non_empty, str_field, ApiResult, ListQuery};
use crate::db::Filter;
use crate::http::{ApiError, ApiResponse, AppState};
use crate::models::{ContactForm, Stored, CONTACT_STATUSES};
use crate::repository::newest_first;
use crate::validation::Validator;

fn not_found() -> ApiError {
    ApiError::NotFound("Contact form not found".into())
}

/// POST /api/contact
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<ContactForm>> {
    let body = json_body(payload)?;
    Validator::new()
        .required("name", str_field(&body, "name"), "Name is required")
        .email("email", str_field(&body, "email"), "Valid email is required")
        .required("message", str_field(&body, "message"), "Message is required")
        .finish()
        .map_err(ApiError::Validation)?;

    let contact = state.repo::<ContactForm>().create(body).await?;
    tracing::info!(id = %contact.id, "Contact form submitted");
    Ok(ApiResponse::created("Contact form submitted successfully", contact))
}

/// GET /api/admin/contacts
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Stored<ContactForm>>> {
    let mut filter = Filter::new();
    if let Some(status) = non_empty(&query.status) {
        filter = filter.eq("status", status);
    }
    let mut contacts = state.repo::<ContactForm>().find(&filter).await?;
    newest_first(&mut contacts);
    Ok(ApiResponse::ok("Contact forms retrieved successfully", contacts))
}

/// GET /api/admin/contacts/{id}
pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Stored<ContactForm>> {
    let contact = state
        .repo::<ContactForm>()
        .get(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Contact form retrieved successfully", contact))
}

/// PUT /api/admin/contacts/{id}; only `status` is updated.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<ContactForm>> {
    let body = json_body(payload)?;
    let status = str_field(&body, "status");
    Validator::new()
        .one_of("status", status, CONTACT_STATUSES, "Invalid status")
        .finish()
        .map_err(ApiError::Validation)?;

    let contact = state
        .repo::<ContactForm>()
        .update(&id, json!({ "status": status }))
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Contact form status updated successfully", contact))
}

/// DELETE /api/admin/contacts/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    state
        .repo::<ContactForm>()
        .delete(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::message(StatusCode::OK, "Contact form deleted successfully"))
}
