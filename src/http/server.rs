//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request id, tracing, CORS, headers, limits, gate)
//! - Serve until the shutdown signal fires

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::auth::TokenService;
use crate::config::SiteConfig;
use crate::db::Connector;
use crate::http::error::error_details_middleware;
use crate::http::middleware::{db_gate_middleware, DbGate};
use crate::models::Model;
use crate::observability::{metrics, spans::RequestSpan};
use crate::repository::Repository;
use crate::security::{cors_layer, rate_limit_middleware, with_security_headers, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub connector: Connector,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: Arc<SiteConfig>, connector: Connector) -> Self {
        let tokens = TokenService::from_config(&config.auth);
        Self {
            config,
            connector,
            tokens,
        }
    }

    pub fn repo<M: Model>(&self) -> Repository<M> {
        Repository::new(Arc::clone(self.connector.driver()))
    }
}

/// Build the full application router with its middleware stack.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let expose_details = config.server.environment.is_development();

    let gate = DbGate::new(state.connector.clone(), config.database.gate_timeout());
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));

    let router = api::router(state)
        .layer(middleware::from_fn_with_state(expose_details, error_details_middleware))
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(middleware::from_fn_with_state(gate, db_gate_middleware))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)));

    with_security_headers(router)
        .layer(cors_layer(&config.server.frontend_url))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// HTTP server for the site backend.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
