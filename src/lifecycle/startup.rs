//! Startup orchestration.
//!
//! # Order
//! 1. `.env` and configuration (fatal on error)
//! 2. Logging and metrics
//! 3. Store driver and connector; the first connect runs in the background
//! 4. Listener bind, then serve until a shutdown signal
//! 5. Close the store connection
//!
//! The server accepts traffic before the store is reachable; the gate
//! middleware holds requests until the connector reports a connection.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{load_config, ConfigError, SiteConfig};
use crate::db::{open_driver, Connector};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::{signals::wait_for_signal, Shutdown};
use crate::observability::{logging, metrics};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Read `.env` (if present) and load the configuration.
pub fn load_settings(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to read .env: {}", e);
        }
    }
    load_config(path)
}

pub fn init_observability(config: &SiteConfig) {
    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}

pub fn build_connector(config: &SiteConfig) -> Connector {
    let driver = open_driver(&config.database);
    Connector::new(driver, &config.database)
}

/// Run the first connect in the background. A missing URI is logged; the
/// server keeps running and reports 500s from the gate.
pub fn spawn_connect(connector: &Connector) -> JoinHandle<()> {
    let connector = connector.clone();
    tokio::spawn(async move {
        if let Err(e) = connector.connect().await {
            tracing::error!(error = %e, "Database configuration error");
        }
    })
}

/// Run the site backend until SIGINT/SIGTERM.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), StartupError> {
    let config = load_settings(config_path.as_deref())?;
    init_observability(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.server.environment,
        bind_address = %config.server.bind_address,
        "site-backend starting"
    );

    let connector = build_connector(&config);
    spawn_connect(&connector);

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.server.bind_address.clone(),
            source,
        })?;

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let state = AppState::new(Arc::new(config), connector.clone());
    HttpServer::new(state)
        .run(listener, server_shutdown)
        .await
        .map_err(StartupError::Server)?;

    if let Err(e) = connector.close().await {
        tracing::warn!(error = %e, "Error while closing database connection");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
