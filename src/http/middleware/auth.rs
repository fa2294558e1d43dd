//! Bearer-token guard for admin routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::AuthError;
use crate::http::response::ApiResponse;
use crate::http::server::AppState;
use crate::models::{Admin, Stored};

/// The admin a request was authenticated as; set by [`require_admin`].
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub Stored<Admin>);

fn unauthorized(message: &str) -> Response {
    ApiResponse::message(StatusCode::UNAUTHORIZED, message).into_response()
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|token| !token.is_empty())
}

pub async fn require_admin(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(token) = bearer_token(&request) else {
        return unauthorized("No token provided. Access denied.");
    };

    let claims = match state.tokens.verify(token) {
        Ok(claims) => claims,
        Err(AuthError::Expired) => return unauthorized("Token expired."),
        Err(_) => return unauthorized("Invalid token."),
    };

    let admin = match state.repo::<Admin>().get(&claims.sub).await {
        Ok(Some(admin)) if admin.inner.is_active => admin,
        Ok(_) => return unauthorized("Invalid or inactive admin account."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load admin for token");
            return ApiResponse::message(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error.")
                .into_response();
        }
    };

    request.extensions_mut().insert(AuthenticatedAdmin(admin));
    next.run(request).await
}
