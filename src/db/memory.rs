//! In-process document store.
//!
//! Backs `memory://` URIs for local development and the test suite. The
//! driver can be made unreachable and can emit disconnect/reconnect events on
//! demand, which is how connection failures are exercised without a network.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::db::driver::{ConnectOptions, Document, DriverEvent, Filter, StoreDriver, StoreError};

const EVENT_CAPACITY: usize = 64;

pub struct MemoryDriver {
    collections: DashMap<String, Vec<Document>>,
    reachable: AtomicBool,
    connected: AtomicBool,
    attempts: Mutex<Vec<Instant>>,
    events: broadcast::Sender<DriverEvent>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            collections: DashMap::new(),
            reachable: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            attempts: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Make subsequent connection attempts succeed or fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of connection attempts made so far.
    pub fn connect_attempts(&self) -> usize {
        self.attempts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Instants at which connection attempts were made.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Drop the connection as if the server went away.
    pub fn simulate_disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events.send(DriverEvent::Disconnected);
    }

    /// Restore the connection as if the driver recovered on its own.
    pub fn simulate_reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(DriverEvent::Reconnected);
    }

    /// Emit a non-fatal error event.
    pub fn simulate_error(&self, message: impl Into<String>) {
        let _ = self.events.send(DriverEvent::Error(message.into()));
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }

    fn position(docs: &[Document], id: &str) -> Option<usize> {
        docs.iter()
            .position(|doc| doc.get("_id").and_then(|v| v.as_str()) == Some(id))
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreDriver for MemoryDriver {
    async fn connect(&self, uri: &str, _options: &ConnectOptions) -> Result<String, StoreError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(Instant::now());
        }

        let url = url::Url::parse(uri).map_err(|e| StoreError::InvalidUri(e.to_string()))?;
        if url.scheme() != "memory" {
            return Err(StoreError::InvalidUri(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(
                "server selection timed out: store unreachable".to_string(),
            ));
        }

        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(DriverEvent::Connected);
        Ok(url.host_str().unwrap_or("memory").to_string())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_connected()
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.events.subscribe()
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        scheme == "memory"
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.ensure_connected()?;
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_connected()?;
        Ok(self.collections.get(collection).and_then(|docs| {
            Self::position(&docs, id).map(|i| docs[i].clone())
        }))
    }

    async fn replace(&self, collection: &str, id: &str, doc: Document) -> Result<bool, StoreError> {
        self.ensure_connected()?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        match Self::position(&docs, id) {
            Some(i) => {
                docs[i] = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_connected()?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(Self::position(&docs, id).map(|i| docs.remove(i)))
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        self.ensure_connected()?;
        Ok(self
            .collections
            .remove(collection)
            .map(|(_, docs)| docs.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn connected() -> MemoryDriver {
        let driver = MemoryDriver::new();
        driver
            .connect("memory://test", &ConnectOptions::default())
            .await
            .unwrap();
        driver
    }

    #[tokio::test]
    async fn test_connect_reports_host() {
        let driver = MemoryDriver::new();
        let host = driver
            .connect("memory://cluster0", &ConnectOptions::default())
            .await
            .unwrap();
        assert_eq!(host, "cluster0");
        assert_eq!(driver.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_and_bad_scheme() {
        let driver = MemoryDriver::new();
        driver.set_reachable(false);
        let err = driver
            .connect("memory://x", &ConnectOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));

        let err = driver
            .connect("mongodb://x", &ConnectOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUri(_)));
        assert_eq!(driver.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let driver = MemoryDriver::new();
        let err = driver.find("services", &Filter::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotConnected));
    }

    #[tokio::test]
    async fn test_crud() {
        let driver = connected().await;
        driver
            .insert("blogs", doc(json!({"_id": "a", "published": true})))
            .await
            .unwrap();
        driver
            .insert("blogs", doc(json!({"_id": "b", "published": false})))
            .await
            .unwrap();

        let published = driver
            .find("blogs", &Filter::new().eq("published", true))
            .await
            .unwrap();
        assert_eq!(published.len(), 1);

        assert!(driver
            .replace("blogs", "b", doc(json!({"_id": "b", "published": true})))
            .await
            .unwrap());
        assert!(!driver
            .replace("blogs", "zzz", doc(json!({"_id": "zzz"})))
            .await
            .unwrap());

        let removed = driver.delete_by_id("blogs", "a").await.unwrap();
        assert!(removed.is_some());
        assert!(driver.find_by_id("blogs", "a").await.unwrap().is_none());
        assert_eq!(driver.delete_all("blogs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_event() {
        let driver = connected().await;
        let mut events = driver.subscribe();
        driver.simulate_disconnect();
        assert_eq!(events.recv().await.unwrap(), DriverEvent::Disconnected);
        assert!(driver.find("x", &Filter::new()).await.is_err());
    }
}
