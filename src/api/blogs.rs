use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::api::{json_body, str_field, with_id, ApiResult};
use crate::db::Filter;
use crate::http::{ApiError, ApiResponse, AppState};
use crate::models::{Blog, Stored};
use crate::repository::newest_first;
use crate::validation::Validator;

fn not_found() -> ApiError {
    ApiError::NotFound("Blog not found".into())
}

/// Public shape: `id`, `date` (YYYY-MM-DD) and `image` (the thumbnail) added.
fn public_view(blog: &Stored<Blog>, include_content: bool) -> Result<Value, ApiError> {
    let mut value = with_id(blog)?;
    if let Value::Object(map) = &mut value {
        if !include_content {
            map.remove("content");
        }
        map.insert("date".into(), Value::String(blog.display_date()));
        map.insert("image".into(), Value::String(blog.inner.thumbnail.clone()));
    }
    Ok(value)
}

/// GET /api/blogs
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Value>> {
    let mut blogs = state
        .repo::<Blog>()
        .find(&Filter::new().eq("published", true))
        .await?;
    blogs.sort_by(|a, b| b.inner.published_at.cmp(&a.inner.published_at));

    let data = blogs
        .iter()
        .map(|blog| public_view(blog, false))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ApiResponse::ok("Blogs retrieved successfully", data))
}

/// GET /api/blogs/{slug}
pub async fn by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Value> {
    let filter = Filter::new().eq("slug", slug).eq("published", true);
    let blog = state
        .repo::<Blog>()
        .find_one(&filter)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Blog retrieved successfully", public_view(&blog, true)?))
}

/// GET /api/admin/blogs
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Vec<Stored<Blog>>> {
    let mut blogs = state.repo::<Blog>().find(&Filter::new()).await?;
    newest_first(&mut blogs);
    Ok(ApiResponse::ok("Blogs retrieved successfully", blogs))
}

/// POST /api/admin/blogs
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<Blog>> {
    let body = json_body(payload)?;
    Validator::new()
        .required("title", str_field(&body, "title"), "Title is required")
        .required("content", str_field(&body, "content"), "Content is required")
        .required("author", str_field(&body, "author"), "Author is required")
        .required("slug", str_field(&body, "slug"), "Slug is required")
        .finish()
        .map_err(ApiError::Validation)?;

    let blog = state.repo::<Blog>().create(body).await?;
    Ok(ApiResponse::created("Blog created successfully", blog))
}

/// PUT /api/admin/blogs/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Stored<Blog>> {
    let body = json_body(payload)?;
    let blog = state
        .repo::<Blog>()
        .update(&id, body)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok("Blog updated successfully", blog))
}

/// DELETE /api/admin/blogs/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    state.repo::<Blog>().delete(&id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::message(StatusCode::OK, "Blog deleted successfully"))
}
