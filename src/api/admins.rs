use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::api::{json_body, str_field, ApiResult};
use crate::auth::{hash_password, verify_password};
use crate::db::Filter;
use crate::http::middleware::AuthenticatedAdmin;
use crate::http::{ApiError, ApiResponse, AppState};
use crate::models::{Admin, AdminProfile};
use crate::validation::Validator;

#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub admin: AdminProfile,
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".into())
}

/// POST /api/admin/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Session> {
    let body = json_body(payload)?;
    let email = str_field(&body, "email").trim().to_lowercase();
    let password = str_field(&body, "password");
    Validator::new()
        .email("email", &email, "Valid email is required")
        .min_len("password", password, 6, "Password must be at least 6 characters")
        .finish()
        .map_err(ApiError::Validation)?;

    let repo = state.repo::<Admin>();
    if repo
        .find_one(&Filter::new().eq("email", email.as_str()))
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest("Admin already exists".into()));
    }

    let mut admin = Admin {
        email,
        password: hash_password(password).await?,
        ..Admin::default()
    };
    if let Some(name) = body.get("name").and_then(Value::as_str) {
        admin.name = name.to_string();
    }

    let admin = repo.insert(admin).await?;
    let token = state.tokens.issue(&admin.id)?;
    tracing::info!(admin_id = %admin.id, "Admin registered");

    Ok(ApiResponse::created(
        "Admin registered successfully",
        Session {
            token,
            admin: AdminProfile::from(&admin),
        },
    ))
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Session> {
    let body = json_body(payload)?;
    let email = str_field(&body, "email").trim().to_lowercase();
    let password = str_field(&body, "password");
    Validator::new()
        .email("email", &email, "Valid email is required")
        .required("password", password, "Password is required")
        .finish()
        .map_err(ApiError::Validation)?;

    let admin = state
        .repo::<Admin>()
        .find_one(&Filter::new().eq("email", email.as_str()))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !admin.inner.is_active {
        return Err(ApiError::Unauthorized("Account is inactive".into()));
    }
    if !verify_password(password, &admin.inner.password).await? {
        tracing::warn!(admin_id = %admin.id, "Rejected login with wrong password");
        return Err(invalid_credentials());
    }

    let token = state.tokens.issue(&admin.id)?;
    Ok(ApiResponse::ok(
        "Login successful",
        Session {
            token,
            admin: AdminProfile::from(&admin),
        },
    ))
}

/// GET /api/admin/me
pub async fn me(Extension(AuthenticatedAdmin(admin)): Extension<AuthenticatedAdmin>) -> ApiResult<AdminProfile> {
    let profile = AdminProfile {
        created_at: Some(admin.created_at),
        ..AdminProfile::from(&admin)
    };
    Ok(ApiResponse::ok("Admin profile retrieved successfully", profile))
}
