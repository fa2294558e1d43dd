//! bcrypt password hashing, run off the async executor.

use bcrypt::BcryptError;

const BCRYPT_COST: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] BcryptError),

    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST)).await??;
    Ok(hash)
}

/// Compare a candidate against a stored hash; malformed hashes never match.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(matched.unwrap_or(false))
}
