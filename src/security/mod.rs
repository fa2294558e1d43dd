//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin check, preflight)
//!     → rate_limit.rs (per-IP budget on /api)
//!     → handlers
//! Outgoing response:
//!     → headers.rs (hardening headers)
//! ```
//!
//! # Design Decisions
//! - Login and register are exempt from rate limiting
//! - Security headers never overwrite ones a handler already set

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::cors_layer;
pub use headers::with_security_headers;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
