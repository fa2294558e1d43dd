//! HS256 bearer tokens for admin sessions.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::AuthConfig;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id.
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token expired.")]
    Expired,

    #[error("Invalid token.")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies admin tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_days: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_days.saturating_mul(SECONDS_PER_DAY),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_days)
    }

    pub fn issue(&self, admin_id: &str) -> Result<String, AuthError> {
        let now = unix_now();
        let claims = Claims {
            sub: admin_id.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new("secret", 7);
        let token = tokens.issue("admin-1").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "admin-1");
        assert_eq!(claims.exp - claims.iat, 7 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = TokenService::new("one", 7).issue("admin-1").unwrap();
        let err = TokenService::new("two", 7).verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::Invalid));
        assert!(matches!(
            TokenService::new("one", 7).verify("garbage").unwrap_err(),
            AuthError::Invalid
        ));
    }

    #[test]
    fn test_expired_token() {
        let tokens = TokenService::new("secret", 7);
        let claims = Claims {
            sub: "admin-1".into(),
            iat: 1_000,
            exp: 2_000,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &tokens.encoding).unwrap();
        assert!(matches!(tokens.verify(&token).unwrap_err(), AuthError::Expired));
    }
}
