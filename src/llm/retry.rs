//! Retry policy with exponential backoff
//!
//! Bounded retry for transient collaborator failures:
//! - Attempts: 1 + `retries`
//! - Strategy: binary exponential with ±25% jitter, capped
//! - Permanent errors (config, budget, timeout) are returned immediately

use crate::errors::Result;
use std::time::Duration;
use tokio::time::sleep;

/// Default number of retries after the first attempt
pub const DEFAULT_RETRIES: u32 = 2;

/// Base delay for exponential backoff
const BASE_DELAY_MS: u64 = 500;

/// Maximum delay cap
const MAX_DELAY_MS: u64 = 8000;

/// Retry policy with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    retries: u32,

    /// Base delay in milliseconds
    base_delay_ms: u64,

    /// Maximum delay cap in milliseconds
    max_delay_ms: u64,

    /// Enable jitter
    enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Create retry policy with default settings
    pub fn new() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    /// Create retry policy with custom settings
    pub fn with_config(retries: u32, base_delay_ms: u64) -> Self {
        Self {
            retries,
            base_delay_ms,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    /// Policy that never retries
    pub fn disabled() -> Self {
        Self::with_config(0, 0)
    }

    /// Disable jitter (deterministic delays)
    pub fn without_jitter(mut self) -> Self {
        self.enable_jitter = false;
        self
    }

    /// Execute operation with retry logic
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.retries {
                        return Err(e);
                    }

                    let delay = self.calculate_delay(attempt);
                    tracing::debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %e, "retrying call");
                    attempt += 1;
                    sleep(delay).await;
                }
            }
        }
    }

    /// Calculate delay for given attempt number
    fn calculate_delay(&self, attempt: u32) -> Duration {
        // Binary exponential backoff: 2^attempt
        let exponential_delay = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));

        let delay_ms = exponential_delay.min(self.max_delay_ms);

        // ±25% random variation
        let final_delay = if self.enable_jitter {
            let jitter = (delay_ms / 4) as i64;
            let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter as f64;
            ((delay_ms as i64) + random_jitter as i64).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipelineError;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::new();

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = policy
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Ok::<i32, PipelineError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*attempt_count.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let policy = RetryPolicy::with_config(3, 10);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = policy
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    let mut attempts = count.lock().unwrap();
                    *attempts += 1;
                    let current = *attempts;
                    drop(attempts);

                    if current < 3 {
                        Err(PipelineError::Generation("503 Service Unavailable".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*attempt_count.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_returns_last_error() {
        let policy = RetryPolicy::with_config(2, 10);

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = policy
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Err::<i32, _>(PipelineError::Generation("Always fails".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(PipelineError::Generation(_))));
        assert_eq!(*attempt_count.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let policy = RetryPolicy::new();

        let attempt_count = Arc::new(Mutex::new(0));
        let count_clone = attempt_count.clone();

        let result = policy
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    *count.lock().unwrap() += 1;
                    Err::<i32, _>(PipelineError::Configuration("Permanent error".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(*attempt_count.lock().unwrap(), 1);
    }

    #[test]
    fn test_calculate_delay() {
        let policy = RetryPolicy::with_config(5, 1000).without_jitter();

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(8000));
        assert_eq!(policy.calculate_delay(10), Duration::from_millis(MAX_DELAY_MS));
    }
}
