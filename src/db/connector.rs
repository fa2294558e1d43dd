//! Document store connector.
//!
//! # Responsibilities
//! - Open the store connection with explicit options
//! - Retry failed attempts with bounded exponential backoff
//! - Translate driver events into [`ConnectionState`] transitions
//! - Let request handling wait, with a deadline, for a usable connection
//!
//! # Design Decisions
//! - Only one retry cycle runs at a time; a second `connect()` is a no-op
//! - Failures are never fatal; only a missing or unusable URI is reported to the caller
//! - Driver listeners are installed once, on the first successful connect
//! - At most one reconnect is pending per burst of `disconnected` events

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;

use crate::config::DatabaseConfig;
use crate::db::driver::{ConnectOptions, DriverEvent, StoreDriver, StoreError};
use crate::db::state::{ConnectionState, ConnectionTracker};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("DATABASE_URI is not defined. Add it to your .env file (copy from env.example).")]
    MissingUri,

    #[error("DATABASE_URI is not a valid URI: {0}")]
    InvalidUri(String),

    #[error("DATABASE_URI scheme '{0}' is not supported by the configured driver")]
    UnsupportedScheme(String),
}

/// Shared handle to the store connection lifecycle.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<Inner>,
}

struct Inner {
    driver: Arc<dyn StoreDriver>,
    tracker: ConnectionTracker,
    uri: Option<String>,
    options: ConnectOptions,
    policy: RetryPolicy,
    reconnect_delay: Duration,
    poll_interval: Duration,
    cycle_active: AtomicBool,
    reconnect_pending: AtomicBool,
    listeners_installed: AtomicBool,
    closing: AtomicBool,
}

/// Held for the duration of a connect/retry cycle.
struct CycleGuard {
    inner: Arc<Inner>,
}

impl CycleGuard {
    fn acquire(inner: &Arc<Inner>) -> Option<Self> {
        inner
            .cycle_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner: Arc::clone(inner),
            })
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.inner.cycle_active.store(false, Ordering::Release);
    }
}

impl Connector {
    pub fn new(driver: Arc<dyn StoreDriver>, config: &DatabaseConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                driver,
                tracker: ConnectionTracker::new(),
                uri: config.uri.clone(),
                options: ConnectOptions::from(config),
                policy: RetryPolicy::from(&config.retry),
                reconnect_delay: config.reconnect_delay(),
                poll_interval: config.wait_poll_interval(),
                cycle_active: AtomicBool::new(false),
                reconnect_pending: AtomicBool::new(false),
                listeners_installed: AtomicBool::new(false),
                closing: AtomicBool::new(false),
            }),
        }
    }

    /// Connect to the store, retrying in the background on failure.
    ///
    /// Returns once the first attempt has finished. A manual call starts a
    /// fresh cycle with the retry counter reset; while a cycle is already
    /// running it does nothing.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let uri = self.uri()?;
        self.inner.closing.store(false, Ordering::Release);
        self.run_cycle(uri, true).await;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.tracker.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.tracker.state()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.tracker.retry_count()
    }

    /// Whether a reconnect after a `disconnected` event is scheduled.
    pub fn reconnect_pending(&self) -> bool {
        self.inner.reconnect_pending.load(Ordering::Acquire)
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.inner.tracker
    }

    pub fn driver(&self) -> &Arc<dyn StoreDriver> {
        &self.inner.driver
    }

    /// Wait until the connection is usable or `timeout` elapses.
    ///
    /// When the store is disconnected and no cycle is running, one background
    /// attempt is started; its outcome is only logged. Returns whether the
    /// connection is usable when the wait settles.
    pub async fn wait_for_connection(&self, timeout: Duration) -> bool {
        if self.is_connected() {
            return true;
        }

        let mut changes = self.inner.tracker.subscribe();
        if matches!(
            self.state(),
            ConnectionState::Disconnected | ConnectionState::Disconnecting
        ) {
            self.trigger_attempt();
        }

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut poll = tokio::time::interval(self.inner.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.is_connected() {
                return true;
            }

            tokio::select! {
                _ = &mut deadline => return self.is_connected(),
                changed = changes.changed() => {
                    if changed.is_err() {
                        (&mut deadline).await;
                        return self.is_connected();
                    }
                }
                _ = poll.tick() => {}
            }
        }
    }

    /// Close the connection; suppresses reconnects until the next `connect()`.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.inner.closing.store(true, Ordering::Release);
        self.inner.tracker.set_state(ConnectionState::Disconnecting);
        let result = self.inner.driver.close().await;
        self.inner.tracker.set_state(ConnectionState::Disconnected);
        tracing::info!("Database connection closed");
        result
    }

    fn uri(&self) -> Result<String, ConnectError> {
        let uri = self
            .inner
            .uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .ok_or(ConnectError::MissingUri)?;

        let parsed = url::Url::parse(uri).map_err(|e| ConnectError::InvalidUri(e.to_string()))?;
        let scheme = parsed.scheme().to_ascii_lowercase();
        if !self.inner.driver.supports_scheme(&scheme) {
            return Err(ConnectError::UnsupportedScheme(scheme));
        }
        Ok(uri.to_string())
    }

    fn trigger_attempt(&self) {
        let uri = match self.uri() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot reconnect to database");
                return;
            }
        };
        let this = self.clone();
        tokio::spawn(async move { this.run_cycle(uri, false).await });
    }

    async fn run_cycle(&self, uri: String, fresh: bool) {
        let Some(guard) = CycleGuard::acquire(&self.inner) else {
            tracing::debug!("Database connection cycle already running");
            return;
        };

        if fresh {
            self.inner.tracker.reset_retries();
        }
        match self.attempt(&uri).await {
            Ok(()) => return,
            Err(StoreError::InvalidUri(reason)) => {
                tracing::error!(error = %reason, "Database URI rejected by driver; not retrying");
                return;
            }
            Err(_) => {}
        }

        let failures = self.retry_count();
        match self.inner.policy.next_delay(failures) {
            Some(delay) => {
                let this = self.clone();
                tokio::spawn(async move { this.retry_loop(uri, delay, guard).await });
            }
            None => self.log_exhausted(failures),
        }
    }

    async fn retry_loop(&self, uri: String, mut delay: Duration, _guard: CycleGuard) {
        loop {
            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                attempt = self.retry_count() + 1,
                max_retries = self.inner.policy.max_retries,
                "Retrying database connection"
            );
            tokio::time::sleep(delay).await;

            if self.inner.closing.load(Ordering::Acquire) || self.is_connected() {
                return;
            }
            match self.attempt(&uri).await {
                Ok(()) => return,
                Err(StoreError::InvalidUri(reason)) => {
                    tracing::error!(error = %reason, "Database URI rejected by driver; not retrying");
                    return;
                }
                Err(_) => {}
            }

            let failures = self.retry_count();
            match self.inner.policy.next_delay(failures) {
                Some(next) => delay = next,
                None => {
                    self.log_exhausted(failures);
                    return;
                }
            }
        }
    }

    async fn attempt(&self, uri: &str) -> Result<(), StoreError> {
        let tracker = &self.inner.tracker;
        tracker.set_state(ConnectionState::Connecting);

        match self.inner.driver.connect(uri, &self.inner.options).await {
            Ok(host) => {
                metrics::record_connect_attempt(true);
                tracker.reset_retries();
                tracker.set_state(ConnectionState::Connected);
                tracing::info!(host = %host, "Database connected");
                self.install_listeners();
                Ok(())
            }
            Err(e) => {
                metrics::record_connect_attempt(false);
                let failures = tracker.record_failure(self.inner.policy.max_retries);
                tracker.set_state(ConnectionState::Disconnected);
                tracing::error!(error = %e, failures, "Database connection failed");
                Err(e)
            }
        }
    }

    fn log_exhausted(&self, failures: u32) {
        tracing::error!(
            failures,
            "Database unreachable after {} attempts; automatic retries stopped",
            failures
        );
        tracing::error!("Check that DATABASE_URI points at the right host and database");
        tracing::error!("Check that this server's IP address is on the database allow-list");
        tracing::error!("Check that the database cluster is running and not paused");
        tracing::error!("Check the username and password in the connection string");
    }

    fn install_listeners(&self) {
        if self
            .inner
            .listeners_installed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let mut events = self.inner.driver.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Dropped database driver events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Connector { inner }.handle_event(event);
            }
        });
    }

    fn handle_event(&self, event: DriverEvent) {
        let tracker = &self.inner.tracker;
        match event {
            DriverEvent::Error(message) => {
                tracing::error!(error = %message, "Database connection error");
            }
            DriverEvent::Disconnected => {
                tracing::warn!("Database disconnected");
                tracker.set_state(ConnectionState::Disconnected);
                if !self.inner.closing.load(Ordering::Acquire) {
                    self.schedule_reconnect();
                }
            }
            DriverEvent::Reconnected => {
                tracing::info!("Database reconnected");
                tracker.reset_retries();
                tracker.set_state(ConnectionState::Connected);
            }
            DriverEvent::Connected => {
                tracker.set_state(ConnectionState::Connected);
            }
        }
    }

    fn schedule_reconnect(&self) {
        if self
            .inner
            .reconnect_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let uri = match self.uri() {
            Ok(uri) => uri,
            Err(_) => {
                self.inner.reconnect_pending.store(false, Ordering::Release);
                return;
            }
        };
        let delay = self.inner.reconnect_delay;
        tracing::info!(delay_ms = delay.as_millis() as u64, "Scheduling database reconnect");

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.inner.reconnect_pending.store(false, Ordering::Release);
            if this.inner.closing.load(Ordering::Acquire) || this.is_connected() {
                return;
            }
            this.run_cycle(uri, false).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDriver;

    fn config(uri: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            uri: uri.map(str::to_string),
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_uri_fails_fast() {
        let driver = Arc::new(MemoryDriver::new());
        let connector = Connector::new(driver.clone(), &config(None));
        assert!(matches!(connector.connect().await, Err(ConnectError::MissingUri)));

        let connector = Connector::new(driver.clone(), &config(Some("   ")));
        assert!(matches!(connector.connect().await, Err(ConnectError::MissingUri)));
        assert_eq!(driver.connect_attempts(), 0);
        assert_eq!(connector.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_success() {
        let driver = Arc::new(MemoryDriver::new());
        let connector = Connector::new(driver, &config(Some("memory://cluster0")));
        connector.connect().await.unwrap();
        assert!(connector.is_connected());
        assert_eq!(connector.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_noop_while_cycle_runs() {
        let driver = Arc::new(MemoryDriver::new());
        driver.set_reachable(false);
        let connector = Connector::new(driver.clone(), &config(Some("memory://x")));

        connector.connect().await.unwrap();
        connector.connect().await.unwrap();
        assert_eq!(driver.connect_attempts(), 1);
        assert_eq!(connector.retry_count(), 1);
    }

    #[tokio::test]
    async fn test_close_sets_disconnected_without_reconnect() {
        let driver = Arc::new(MemoryDriver::new());
        let connector = Connector::new(driver.clone(), &config(Some("memory://x")));
        connector.connect().await.unwrap();

        connector.close().await.unwrap();
        driver.simulate_disconnect();
        tokio::task::yield_now().await;

        assert_eq!(connector.state(), ConnectionState::Disconnected);
        assert!(!connector.reconnect_pending());
    }
}
