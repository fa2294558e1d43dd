//! Request middleware.

pub mod auth;
pub mod db_gate;

pub use auth::{require_admin, AuthenticatedAdmin};
pub use db_gate::{db_gate_middleware, DbGate, HEALTH_PATHS};
