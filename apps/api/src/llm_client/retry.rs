//! One retry abstraction for every provider adapter: which errors are retryable,
//! how many attempts in total, and a doubling backoff from an initial delay.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::LlmError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first call. Always ≥ 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub retry_on: fn(&LlmError) -> bool,
}

impl RetryPolicy {
    /// Single attempt; every error propagates immediately.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            retry_on: |_| false,
        }
    }

    /// Default provider: 3 attempts, 2s then 4s, only when the provider reports overload.
    pub fn on_overload() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            retry_on: LlmError::is_overloaded,
        }
    }

    /// NVIDIA integration: 3 attempts, 3s then 6s, only on request timeouts.
    pub fn on_timeout() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(3),
            retry_on: LlmError::is_timeout,
        }
    }

    /// Delay before attempt `attempt` (1-based; attempt 1 never waits).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.initial_delay * 2u32.saturating_pow(attempt - 2)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && (self.retry_on)(&e) => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "{label} attempt {}/{max_attempts} failed ({e}), retrying in {}ms",
                        attempt - 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
