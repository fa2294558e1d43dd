//! Admin authentication: password hashing and bearer tokens.

pub mod password;
pub mod tokens;

pub use password::{hash_password, verify_password, PasswordError};
pub use tokens::{AuthError, Claims, TokenService};
