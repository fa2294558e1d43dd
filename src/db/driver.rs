//! Document store driver abstraction.
//!
//! A driver owns the physical connection (pool, sockets) and reports
//! connectivity changes on a broadcast channel. The connector decides what
//! those events mean for [`ConnectionState`](super::ConnectionState).

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::{DatabaseConfig, WriteConcern};
use crate::db::memory::MemoryDriver;
use crate::db::postgres::PostgresDriver;

/// A stored document: a JSON object with `_id`, `createdAt`, `updatedAt`.
pub type Document = Map<String, Value>;

/// Connectivity events emitted by a driver after the first successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Connected,
    Error(String),
    Disconnected,
    Reconnected,
}

/// Options applied to every connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub server_selection_timeout: Duration,
    pub socket_timeout: Duration,
    pub connect_timeout: Duration,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    pub write_concern: WriteConcern,
    pub retry_writes: bool,
}

impl From<&DatabaseConfig> for ConnectOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            server_selection_timeout: Duration::from_millis(config.server_selection_timeout_ms),
            socket_timeout: Duration::from_millis(config.socket_timeout_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            min_pool_size: config.min_pool_size,
            max_pool_size: config.max_pool_size,
            write_concern: config.write_concern,
            retry_writes: config.retry_writes,
        }
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("not connected to the document store")]
    NotConnected,

    #[error("invalid connection uri: {0}")]
    InvalidUri(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("stored document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Equality filter on top-level document fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    /// JSON object form, suitable for containment queries.
    pub fn to_json(&self) -> Value {
        Value::Object(self.conditions.iter().cloned().collect())
    }
}

#[async_trait]
pub trait StoreDriver: Send + Sync + 'static {
    /// Open the connection; returns the host that was reached.
    async fn connect(&self, uri: &str, options: &ConnectOptions) -> Result<String, StoreError>;

    /// Close the connection and release pooled resources.
    async fn close(&self) -> Result<(), StoreError>;

    /// Round-trip to the store; fails when no usable connection exists.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Subscribe to connectivity events.
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent>;

    /// Whether `connect` understands URIs with this scheme.
    fn supports_scheme(&self, scheme: &str) -> bool;

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Replace a document; returns false when no document had that id.
    async fn replace(&self, collection: &str, id: &str, doc: Document) -> Result<bool, StoreError>;

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Remove every document in a collection; returns the number removed.
    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError>;
}

/// Pick a driver for the configured URI scheme.
///
/// Unknown or missing URIs fall back to the in-memory driver; the connector
/// rejects them before any attempt is made.
pub fn open_driver(config: &DatabaseConfig) -> Arc<dyn StoreDriver> {
    let scheme = config
        .uri
        .as_deref()
        .and_then(|uri| url::Url::parse(uri).ok())
        .map(|url| url.scheme().to_ascii_lowercase());

    match scheme.as_deref() {
        Some("postgres") | Some("postgresql") => {
            Arc::new(PostgresDriver::new(config.probe_interval()))
        }
        _ => Arc::new(MemoryDriver::new()),
    }
}
