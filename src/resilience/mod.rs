//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection attempt fails:
//!     → connector bumps the retry counter
//!     → backoff.rs (RetryPolicy::next_delay)
//!     → Some(delay): sleep, try again
//!     → None: stop and log diagnostics
//! ```
//!
//! # Design Decisions
//! - Schedule is deterministic unless jitter is configured
//! - Retry bound is a count of consecutive failures, not wall-clock time

pub mod backoff;

pub use backoff::{calculate_backoff, RetryPolicy};
