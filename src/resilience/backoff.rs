//! Exponential backoff for connection retries.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Calculate the exponential backoff delay for the given failure count.
///
/// `attempt` is 1-based: the first failure waits `base_ms`, the second `2 * base_ms`, ...
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);

    Duration::from_millis(delay_ms.min(max_ms))
}

/// Add up to `ratio` of extra random delay.
pub fn with_jitter(delay: Duration, ratio: f64) -> Duration {
    let delay_ms = delay.as_millis() as u64;
    let jitter_range = (delay_ms as f64 * ratio) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}

/// Bounded retry schedule used by the connector.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    /// Raw backoff for the n-th consecutive failure, ignoring the retry bound.
    pub fn delay_for(&self, failures: u32) -> Duration {
        calculate_backoff(
            failures,
            self.initial_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }

    /// Delay before the next automatic attempt, or `None` once retries are exhausted.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures == 0 || failures >= self.max_retries {
            return None;
        }
        Some(with_jitter(self.delay_for(failures), self.jitter_ratio))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter_ratio: config.jitter_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 100, 2000).as_millis(), 100);
        assert_eq!(calculate_backoff(2, 100, 2000).as_millis(), 200);
        assert_eq!(calculate_backoff(10, 100, 1000).as_millis(), 1000);
        assert_eq!(calculate_backoff(200, 100, u64::MAX).as_millis(), u64::MAX as u128);
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![5_000, 10_000, 20_000, 40_000, 80_000]);
    }

    #[test]
    fn test_retry_bound() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(0), None);
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(4), Some(Duration::from_secs(40)));
        assert_eq!(policy.next_delay(5), None);
        assert_eq!(policy.next_delay(6), None);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let base = Duration::from_millis(1000);
        for _ in 0..50 {
            let jittered = with_jitter(base, 0.1);
            assert!(jittered >= base && jittered < Duration::from_millis(1100));
        }
        assert_eq!(with_jitter(base, 0.0), base);
    }
}
