//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the site backend.
//! All types derive Serde traits for deserialization from config files; process
//! environment overrides are applied afterwards by the loader.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration for the site backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Document store connection and lifecycle settings.
    pub database: DatabaseConfig,

    /// Admin authentication settings.
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        };
        f.write_str(name)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Deployment environment; development echoes error details to clients.
    pub environment: Environment,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Allowed CORS origin (the marketing frontend).
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            environment: Environment::Development,
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Write acknowledgment level requested from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteConcern {
    #[default]
    Majority,
    Acknowledged,
}

/// Document store connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URI (`postgres://...` or `memory://...`). Usually set via `DATABASE_URI`.
    pub uri: Option<String>,

    /// Time allowed to find a usable server, in milliseconds.
    pub server_selection_timeout_ms: u64,

    /// Per-operation socket timeout in milliseconds.
    pub socket_timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Minimum pooled connections.
    pub min_pool_size: u32,

    /// Maximum pooled connections.
    pub max_pool_size: u32,

    pub write_concern: WriteConcern,

    /// Retry failed writes once at the driver layer.
    pub retry_writes: bool,

    /// Automatic reconnect policy after failed attempts.
    pub retry: RetryConfig,

    /// Delay before reconnecting after the driver reports a disconnect.
    pub reconnect_delay_ms: u64,

    /// How long a gated request waits for a connection.
    pub gate_timeout_ms: u64,

    /// Polling interval used while waiting for a connection.
    pub wait_poll_interval_ms: u64,

    /// Liveness probe interval for network drivers, in seconds.
    pub probe_interval_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            server_selection_timeout_ms: 30_000,
            socket_timeout_ms: 45_000,
            connect_timeout_ms: 30_000,
            min_pool_size: 2,
            max_pool_size: 10,
            write_concern: WriteConcern::Majority,
            retry_writes: true,
            retry: RetryConfig::default(),
            reconnect_delay_ms: 5_000,
            gate_timeout_ms: 20_000,
            wait_poll_interval_ms: 200,
            probe_interval_secs: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

/// Retry configuration for connection attempts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Consecutive failures after which automatic retries stop.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Random extra delay as a fraction of the computed delay (0.0 disables).
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 5_000,
            max_delay_ms: 300_000,
            jitter_ratio: 0.0,
        }
    }
}

/// Admin authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing admin tokens. Usually set via `JWT_SECRET`.
    pub jwt_secret: String,

    /// Token lifetime in days.
    pub token_ttl_days: u64,
}

/// Placeholder secret rejected in production.
pub const DEFAULT_JWT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_days: 7,
        }
    }
}

/// Rate limiting configuration for `/api` routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client IP within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Paths never rate limited.
    pub exempt_paths: Vec<String>,

    /// Key clients by the first `x-forwarded-for` hop instead of the peer
    /// address. Enable only behind a proxy that sets the header itself.
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
            exempt_paths: vec![
                "/api/admin/login".to_string(),
                "/api/admin/register".to_string(),
            ],
            trust_proxy: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "site_backend=info,tower_http=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
