//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment overrides, validate.
pub fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => SiteConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay well-known environment variables onto `config`.
///
/// `lookup` abstracts the environment so callers (and tests) can supply their own source.
pub fn apply_env_overrides<F>(config: &mut SiteConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(uri) = lookup("DATABASE_URI") {
        config.database.uri = Some(uri);
    }
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: "PORT",
            value: port.clone(),
        })?;
        config.server.bind_address = format!("0.0.0.0:{}", port);
    }
    if let Some(env) = lookup("APP_ENV") {
        config.server.environment = env
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key: "APP_ENV", value: env.clone() })?;
    }
    if let Some(origin) = lookup("FRONTEND_URL") {
        config.server.frontend_url = origin;
    }
    if let Some(secret) = lookup("JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(days) = lookup("JWT_EXPIRES_IN_DAYS") {
        config.auth.token_ttl_days = days.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: "JWT_EXPIRES_IN_DAYS",
            value: days.clone(),
        })?;
    }
    if let Some(trust) = lookup("TRUST_PROXY") {
        config.rate_limit.trust_proxy = match trust.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: "TRUST_PROXY",
                    value: trust.clone(),
                })
            }
        };
    }
    if let Some(timeout) = lookup("DB_GATE_TIMEOUT_MS") {
        config.database.gate_timeout_ms = timeout.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: "DB_GATE_TIMEOUT_MS",
            value: timeout.clone(),
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Environment;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("DATABASE_URI", "postgres://db.internal/site"),
                ("PORT", "8080"),
                ("APP_ENV", "production"),
                ("JWT_SECRET", "s3cret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.uri.as_deref(), Some("postgres://db.internal/site"));
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.environment, Environment::Production);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert!(!config.rate_limit.trust_proxy);
    }

    #[test]
    fn test_trust_proxy_flag() {
        let mut config = SiteConfig::default();
        apply_env_overrides(&mut config, env(&[("TRUST_PROXY", "true")])).unwrap();
        assert!(config.rate_limit.trust_proxy);

        let err = apply_env_overrides(&mut config, env(&[("TRUST_PROXY", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "TRUST_PROXY", .. }));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let mut config = SiteConfig::default();
        apply_env_overrides(&mut config, env(&[("DATABASE_URI", "  ")])).unwrap();
        assert!(config.database.uri.is_none());
    }

    #[test]
    fn test_bad_port_is_reported() {
        let mut config = SiteConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "PORT", .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
