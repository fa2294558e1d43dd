//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/db_gate.rs (hold until the store is usable)
//!     → middleware/auth.rs (admin routes only)
//!     → api handlers
//!     → response.rs / error.rs (JSON envelope)
//! ```

pub mod error;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use error::ApiError;
pub use response::ApiResponse;
pub use server::{build_router, AppState, HttpServer};
