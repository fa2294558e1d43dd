//! Connection state tracking.
//!
//! # States
//! ```text
//! Disconnected → Connecting → Connected
//! Connecting   → Disconnected            (attempt failed)
//! Connected    → Disconnected            (driver reported loss)
//! Connected    → Disconnecting → Disconnected (close)
//! ```
//!
//! # Design Decisions
//! - The state lives in a `watch` channel so waiters are woken on change
//! - Only the connector writes; everything else reads or subscribes
//! - The retry counter is a plain atomic read by the backoff calculator

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::watch;

use crate::observability::metrics;

/// Driver-reported readiness of the document store connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected = 0,
    Connected = 1,
    Connecting = 2,
    Disconnecting = 3,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide connectivity state and retry counter.
#[derive(Debug)]
pub struct ConnectionTracker {
    state: watch::Sender<ConnectionState>,
    retries: AtomicU32,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            retries: AtomicU32::new(0),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Consecutive failed attempts since the last successful connection.
    pub fn retry_count(&self) -> u32 {
        self.retries.load(Ordering::Acquire)
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub(super) fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Connection state changed");
            metrics::record_connection_state(next);
        }
    }

    /// Count a failed attempt; the counter saturates at `ceiling`.
    pub(super) fn record_failure(&self, ceiling: u32) -> u32 {
        let previous = self
            .retries
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < ceiling).then_some(n + 1)
            })
            .unwrap_or(ceiling);
        let failures = previous.saturating_add(1).min(ceiling);
        metrics::record_retry_count(failures);
        failures
    }

    pub(super) fn reset_retries(&self) {
        self.retries.store(0, Ordering::Release);
        metrics::record_retry_count(0);
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ConnectionState; 4] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Disconnecting,
    ];

    #[test]
    fn test_starts_disconnected() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert_eq!(tracker.retry_count(), 0);
    }

    #[test]
    fn test_is_connected_only_when_connected() {
        let tracker = ConnectionTracker::new();
        for state in ALL {
            tracker.set_state(state);
            assert_eq!(tracker.is_connected(), state == ConnectionState::Connected, "state {}", state);
        }
    }

    #[test]
    fn test_retry_counter() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.record_failure(5), 1);
        assert_eq!(tracker.record_failure(5), 2);
        assert_eq!(tracker.retry_count(), 2);
        tracker.reset_retries();
        assert_eq!(tracker.retry_count(), 0);
    }

    #[test]
    fn test_retry_counter_stops_at_ceiling() {
        let tracker = ConnectionTracker::new();
        for _ in 0..3 {
            tracker.record_failure(3);
        }
        assert_eq!(tracker.record_failure(3), 3);
        assert_eq!(tracker.retry_count(), 3);
        tracker.reset_retries();
        assert_eq!(tracker.retry_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let tracker = ConnectionTracker::new();
        let mut rx = tracker.subscribe();
        tracker.set_state(ConnectionState::Connecting);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connecting);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Disconnecting).unwrap();
        assert_eq!(json, "\"disconnecting\"");
    }
}
