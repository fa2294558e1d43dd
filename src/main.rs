//! site-backend server entry point.
//!
//! ```text
//!   client ──▶ request id / trace / cors / headers
//!          ──▶ timeout / body limit / rate limit
//!          ──▶ db gate (waits for the connector)
//!          ──▶ api handlers ──▶ repository ──▶ store driver (postgres | memory)
//! ```
//!
//! Configuration comes from an optional TOML file (`SITE_CONFIG` or the first
//! argument) overlaid with environment variables.

use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SITE_CONFIG").ok())
        .map(PathBuf::from);

    if let Err(e) = site_backend::lifecycle::run(config_path).await {
        eprintln!("fatal: {}", e);
        tracing::error!(error = %e, "site-backend exited with an error");
        std::process::exit(1);
    }
}
