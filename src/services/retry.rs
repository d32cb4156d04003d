//! Retry policy shared by all adapters.
//!
//! Rate-limited calls rotate to the next API key and retry immediately. Once
//! every key in the pool has been tried in the same call, the next attempt
//! waits with exponential backoff (capped, optionally jittered) before cycling
//! again. The total number of attempts is always bounded.

use super::ServiceError;
use crate::config::RetrySettings;
use crate::keys::KeyRotator;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry and polling limits for external calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per call, including the first.
    pub max_attempts: u32,
    /// Base delay once the whole key pool is exhausted. Actual delay = base * 2^cycle.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Add up to base_delay/2 of random jitter.
    pub jitter: bool,
    /// Interval between status checks on long-running operations.
    pub poll_interval: Duration,
    /// Give up on a long-running operation after this long. `None` waits forever.
    pub poll_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 11,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
            poll_interval: Duration::from_secs(10),
            poll_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from the `[retry]` and `[video]` settings sections.
    pub fn from_settings(retry: &RetrySettings, poll_interval_secs: u64, poll_timeout_secs: Option<u64>) -> Self {
        Self {
            max_attempts: retry.max_attempts.max(1),
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            jitter: retry.jitter,
            poll_interval: Duration::from_secs(poll_interval_secs),
            poll_timeout: poll_timeout_secs.map(Duration::from_secs),
        }
    }

    /// A policy that never sleeps. Used in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
            poll_interval: Duration::ZERO,
            poll_timeout: None,
        }
    }

    /// Delay before the next attempt after `cycle` full passes over the key pool.
    pub fn delay_for_cycle(&self, cycle: u32) -> Duration {
        let multiplier = 1u32.checked_shl(cycle).unwrap_or(u32::MAX);
        let capped = self
            .base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        if !self.jitter {
            return capped;
        }

        let jitter_range_ms = self.base_delay.as_millis() as u64 / 2;
        if jitter_range_ms == 0 {
            return capped;
        }
        let jitter_ms = rand::rng().random_range(0..jitter_range_ms);
        (capped + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }
}

/// Run `operation` with the current key, rotating on rate limits.
///
/// The closure receives the key to use for this attempt. Non rate-limit
/// errors are returned immediately. When the attempt budget runs out the last
/// rate-limit error is returned.
pub async fn call_with_rotation<T, F, Fut>(
    rotator: &KeyRotator,
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, ServiceError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let pool_size = rotator.len() as u32;
    let mut attempt: u32 = 0;

    loop {
        let (index, key) = rotator.current();
        let key = key.to_string();

        match operation(key).await {
            Ok(value) => return Ok(value),
            Err(ServiceError::RateLimited(message)) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(ServiceError::RateLimited(format!(
                        "{} (gave up after {} attempts)",
                        message, attempt
                    )));
                }

                warn!(
                    attempt,
                    max = policy.max_attempts,
                    key_slot = index + 1,
                    "API key rate limited, rotating: {}",
                    message
                );
                rotator.rotate_from(index);

                // Every key has been tried since the last pause.
                if attempt % pool_size == 0 {
                    let delay = policy.delay_for_cycle(attempt / pool_size - 1);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Retry `operation` on rate limits without key rotation (e.g. OAuth-bound calls).
pub async fn retry_rate_limited<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, ServiceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Err(ServiceError::RateLimited(message)) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(ServiceError::RateLimited(message));
                }
                let delay = policy.delay_for_cycle(attempt - 1);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "Rate limited, backing off: {}", message);
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rotator(n: usize) -> KeyRotator {
        KeyRotator::new((0..n).map(|i| format!("k{}", i)).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_two_rate_limits_then_success_rotates_twice() {
        let keys = rotator(3);
        let calls = AtomicU32::new(0);

        let result = call_with_rotation(&keys, &RetryPolicy::immediate(10), |key| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ServiceError::RateLimited("Quota exceeded".into()))
                } else {
                    Ok(key)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "k2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(keys.current_index(), 2);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_is_not_retried() {
        let keys = rotator(2);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = call_with_rotation(&keys, &RetryPolicy::immediate(10), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::Unavailable("500".into())) }
        })
        .await;

        assert_eq!(result, Err(ServiceError::Unavailable("500".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(keys.current_index(), 0);
    }

    #[tokio::test]
    async fn test_attempt_budget_bounds_sustained_rate_limiting() {
        let keys = rotator(2);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = call_with_rotation(&keys, &RetryPolicy::immediate(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::RateLimited("rate limit".into())) }
        })
        .await;

        assert!(matches!(result, Err(ServiceError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            jitter: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for_cycle(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_cycle(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_cycle(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for_cycle(40), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_retry_rate_limited_without_rotation() {
        let calls = AtomicU32::new(0);
        let result = retry_rate_limited(&RetryPolicy::immediate(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ServiceError::RateLimited("quotaExceeded".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(1));
    }
}
