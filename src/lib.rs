//! Content and leads backend for a marketing site.
//!
//! Serves public content (services, products, blog posts, site settings),
//! accepts contact and demo-request leads, and exposes an authenticated
//! admin surface. Every request except health checks waits behind the
//! [`db::Connector`] until the document store is usable.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod repository;
pub mod resilience;
pub mod security;
pub mod seed;
pub mod validation;

pub use config::SiteConfig;
pub use db::Connector;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
