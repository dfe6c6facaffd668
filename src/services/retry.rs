use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded exponential backoff for a single provider.
///
/// After the n-th failed attempt (0-based) the executor sleeps
/// `initial_delay * 2^n` before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Two attempts, used by chain links that must keep total latency low.
    pub const fn tight(initial_delay: Duration) -> Self {
        Self::new(2, initial_delay)
    }

    /// A single attempt with no backoff.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay slept after the given failed attempt (0-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(failed_attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The last error is returned on exhaustion.
pub async fn execute<T, F, Fut>(policy: RetryPolicy, label: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut failures = 0u32;

    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                debug!("{}: not retrying: {}", label, e);
                return Err(e);
            }
            Err(e) => e,
        };

        failures += 1;
        if failures >= max_attempts {
            debug!("{}: giving up after {} attempts", label, failures);
            return Err(err);
        }

        let delay = policy.delay_after(failures - 1);
        if err.is_rate_limited() {
            warn!(
                "{}: rate limited (attempt {}/{}), backing off {:?}",
                label, failures, max_attempts, delay
            );
        } else {
            debug!(
                "{}: attempt {}/{} failed: {}, retrying in {:?}",
                label, failures, max_attempts, err, delay
            );
        }
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::types::PriceSource;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn timeout() -> FeedError {
        FeedError::Timeout {
            provider: PriceSource::Yahoo,
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(40), Duration::from_millis(1000).saturating_mul(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_attempted_max_times() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = execute(RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(timeout()) }
        })
        .await;

        assert!(matches!(result, Err(FeedError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second, none after the last.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);

        let result = execute(RetryPolicy::tight(Duration::from_millis(500)), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(timeout())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_is_not_retried() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = execute(RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FeedError::Unconfigured {
                    provider: PriceSource::Finnhub,
                })
            }
        })
        .await;

        assert!(matches!(result, Err(FeedError::Unconfigured { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _ = execute(RetryPolicy::new(0, Duration::from_secs(1)), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(timeout()) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
