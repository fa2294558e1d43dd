//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool bounds ordered)
//! - Refuse placeholder secrets outside development
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - A missing database URI is NOT a validation error; the connector reports it

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{Environment, SiteConfig, DEFAULT_JWT_SECRET};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be greater than 0"));
    }

    let db = &config.database;
    if db.max_pool_size == 0 {
        errors.push(ValidationError::new("database.max_pool_size", "must be greater than 0"));
    }
    if db.min_pool_size > db.max_pool_size {
        errors.push(ValidationError::new(
            "database.min_pool_size",
            format!("{} exceeds max_pool_size {}", db.min_pool_size, db.max_pool_size),
        ));
    }
    for (field, value) in [
        ("database.server_selection_timeout_ms", db.server_selection_timeout_ms),
        ("database.socket_timeout_ms", db.socket_timeout_ms),
        ("database.connect_timeout_ms", db.connect_timeout_ms),
        ("database.gate_timeout_ms", db.gate_timeout_ms),
        ("database.wait_poll_interval_ms", db.wait_poll_interval_ms),
        ("database.retry.initial_delay_ms", db.retry.initial_delay_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    if config.server.request_timeout_secs > 0
        && db.gate_timeout_ms >= config.server.request_timeout_secs.saturating_mul(1000)
    {
        errors.push(ValidationError::new(
            "database.gate_timeout_ms",
            format!(
                "{} must be shorter than server.request_timeout_secs ({}s)",
                db.gate_timeout_ms, config.server.request_timeout_secs
            ),
        ));
    }
    if db.retry.max_delay_ms < db.retry.initial_delay_ms {
        errors.push(ValidationError::new(
            "database.retry.max_delay_ms",
            "must not be smaller than initial_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&db.retry.jitter_ratio) {
        errors.push(ValidationError::new("database.retry.jitter_ratio", "must be within 0.0..=1.0"));
    }

    if config.auth.jwt_secret.trim().is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "must not be empty"));
    } else if config.auth.jwt_secret == DEFAULT_JWT_SECRET
        && config.server.environment == Environment::Production
    {
        errors.push(ValidationError::new(
            "auth.jwt_secret",
            "placeholder secret is not allowed in production; set JWT_SECRET",
        ));
    }
    if config.auth.token_ttl_days == 0 {
        errors.push(ValidationError::new("auth.token_ttl_days", "must be greater than 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SiteConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = SiteConfig::default();
        config.database.min_pool_size = 20;
        config.database.gate_timeout_ms = 0;
        config.server.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"database.min_pool_size"));
        assert!(fields.contains(&"database.gate_timeout_ms"));
        assert!(fields.contains(&"server.bind_address"));
    }

    #[test]
    fn test_placeholder_secret_rejected_in_production() {
        let mut config = SiteConfig::default();
        config.server.environment = Environment::Production;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "auth.jwt_secret");

        config.auth.jwt_secret = "a-real-secret".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_gate_timeout_must_fit_inside_request_timeout() {
        let mut config = SiteConfig::default();
        config.server.request_timeout_secs = 30;

        config.database.gate_timeout_ms = 40_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "database.gate_timeout_ms");

        config.database.gate_timeout_ms = 30_000;
        assert!(validate_config(&config).is_err());

        config.database.gate_timeout_ms = 29_999;
        assert!(validate_config(&config).is_ok());
    }
}
