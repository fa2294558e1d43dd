//! Mapping of internal failures to JSON error responses.

use axum::{
    body::{to_bytes, Body},
    extract::{rejection::JsonRejection, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use thiserror::Error;

use crate::auth::{AuthError, PasswordError};
use crate::db::StoreError;
use crate::repository::RepoError;
use crate::validation::FieldError;

/// Error chain of a failed request, carried on 5xx responses as an extension.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database temporarily unavailable")]
    Unavailable(#[source] StoreError),

    #[error("Internal server error")]
    Internal(#[source] Box<dyn StdError + Send + Sync>),
}

impl ApiError {
    pub fn internal(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Internal(Box::new(err))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

fn error_chain(err: &dyn StdError) -> String {
    let mut lines = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.join("\n")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = status.is_server_error().then(|| {
            let chain = error_chain(&self);
            tracing::error!(error = %chain, "Request failed");
            ErrorDetail(chain)
        });

        let message = self.to_string();
        let errors = match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            message,
            errors,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

/// Render the [`ErrorDetail`] of a 5xx response as a `stack` field when
/// `expose` is set; otherwise just strip it.
pub async fn error_details_middleware(
    State(expose): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(ErrorDetail(stack)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    if !expose {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Could not buffer error body");
            return Response::from_parts(parts, Body::empty());
        }
    };
    let mut json: Value = match serde_json::from_slice(&bytes) {
        Ok(json) => json,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    if let Some(fields) = json.as_object_mut() {
        fields.insert("stack".to_string(), Value::String(stack));
    }
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(json.to_string()))
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Validation(errors) => ApiError::Validation(errors),
            RepoError::Duplicate(field) => ApiError::BadRequest(format!("{} already exists", field)),
            RepoError::InvalidPayload(message) => ApiError::BadRequest(message),
            RepoError::Store(err) => err.into(),
            RepoError::Serialization(err) => ApiError::internal(err),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotConnected | StoreError::Connection(_) => ApiError::Unavailable(err),
            other => ApiError::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired | AuthError::Invalid => ApiError::Unauthorized(err.to_string()),
            AuthError::Signing(_) => ApiError::internal(err),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::internal(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn failing() -> Result<(), ApiError> {
        Err(ApiError::internal(std::io::Error::other("disk on fire")))
    }

    async fn missing() -> Result<(), ApiError> {
        Err(ApiError::NotFound("Service not found".into()))
    }

    async fn body_from(expose: bool, path: &str) -> (StatusCode, Value) {
        let router = Router::new()
            .route("/fail", get(failing))
            .route("/missing", get(missing))
            .layer(middleware::from_fn_with_state(expose, error_details_middleware));
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_stack_rendered_per_router() {
        let ((dev_status, dev), (prod_status, prod)) =
            tokio::join!(body_from(true, "/fail"), body_from(false, "/fail"));

        assert_eq!(dev_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(prod_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(dev["stack"].as_str().unwrap().contains("disk on fire"));
        assert!(prod.get("stack").is_none());
        assert_eq!(dev["message"], "Internal server error");
        assert_eq!(prod["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_client_errors_never_carry_stack() {
        let (status, body) = body_from(true, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Service not found");
        assert!(body.get("stack").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(RepoError::Duplicate("slug".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::NotConnected).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(StoreError::Query("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::from(AuthError::Expired).to_string(), "Token expired.");
    }

    #[test]
    fn test_duplicate_message() {
        let err = ApiError::from(RepoError::Duplicate("email".into()));
        assert_eq!(err.to_string(), "email already exists");
    }

    #[test]
    fn test_error_chain_lists_causes() {
        let err = ApiError::from(StoreError::Query("relation missing".into()));
        let chain = error_chain(&err);
        assert!(chain.starts_with("Internal server error"));
        assert!(chain.contains("relation missing"));
    }
}
