//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (request counters, connection gauges)
//!     → spans.rs (per-request spans carrying the request id)
//!
//! Consumers:
//!     → stdout (pretty in development, JSON when configured)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every request span
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
pub mod spans;
