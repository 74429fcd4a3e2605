//! Bounded retry with exponential backoff for store reads
//!
//! Retries only on transient store errors (unavailable, timeout, I/O).
//! Everything else is returned immediately without retry.

use std::future::Future;
use std::time::Duration;

use vellum_core::StoreError;

/// How often and how patiently to retry a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// 3 retries: 200ms, 400ms, 800ms
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// Run `f` under a time limit, turning expiry into [`StoreError::Timeout`]
pub async fn with_timeout<T, Fut>(limit: Duration, fut: Fut) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

/// Call `f` until it succeeds, fails permanently, or retries run out
pub async fn retry_transient<T, F, Fut>(
    policy: RetryPolicy,
    op: &str,
    mut f: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    // Retry attempts with backoff, then one final attempt without retry.
    for attempt in 0..policy.max_retries {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    op,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    "Store call failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
    f().await
}
