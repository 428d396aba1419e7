//! Bounded retry with exponential backoff, and fixed-interval pacing.
//!
//! One explicit policy serves both collaborators (platform and classifier).
//! When the service supplies a retry-after hint the larger of the hint and
//! the computed backoff wins.

use std::time::{Duration, Instant};

use crate::error::{Result, ScreenError};

/// Backoff never grows past this, regardless of multiplier and attempt count.
const MAX_BACKOFF: Duration = Duration::from_secs(64);

/// Bounded retry policy: {max_attempts, base_delay, backoff_multiplier}.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Must be >= 1.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Exponential factor applied per retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-indexed: 0 = first retry).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        Duration::from_millis(millis as u64).min(MAX_BACKOFF)
    }
}

/// Run `operation` under the policy, retrying retryable errors with
/// exponential backoff. The last error is surfaced on exhaustion;
/// non-retryable errors are surfaced immediately.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let mut delay = policy.delay_for_attempt(attempt - 1);
                if let ScreenError::RateLimited { retry_after } = &err {
                    delay = delay.max(*retry_after);
                }
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "call failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Fixed minimum delay between calls. This is a pacing policy, not adaptive
/// congestion control: the interval never changes at runtime.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Sleep out whatever remains of the interval since the previous call,
    /// then mark this call. The first call never waits.
    pub async fn pace(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
