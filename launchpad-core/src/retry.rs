// Exponential backoff for blockchain calls.

use crate::config::RetryConfig;
use crate::error::{ErrorCode, PlatformError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs `operation` up to `max_retries` times.
///
/// Retryable failures sleep `base_delay * 2^(attempt - 1)` before the next
/// attempt; a retryable failure on the last attempt surfaces as
/// `MAX_RETRIES_EXCEEDED`. Non-retryable failures are returned immediately.
pub async fn execute_with_retry<T, F, Fut>(
    mut operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<PlatformError> = None;

    for attempt in 1..=max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.retryable => return Err(err),
            Err(err) => {
                if attempt < max_retries {
                    let delay = backoff_delay(base_delay, attempt);
                    warn!(
                        "Retryable failure on attempt {}/{}: {}; retrying in {}ms",
                        attempt,
                        max_retries,
                        err,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(err);
            }
        }
    }

    let detail = last_error
        .map(|e| format!(": last error {e}"))
        .unwrap_or_default();
    Err(PlatformError::blockchain(
        ErrorCode::MaxRetriesExceeded,
        format!("maximum retry attempts exceeded ({max_retries}){detail}"),
        false,
    ))
}

/// Delay before the attempt following `attempt` (1-based).
pub fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base_delay.saturating_mul(1u32 << exponent)
}

/// Retry policy handed to services; a plain value, not global state.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        execute_with_retry(operation, self.max_retries, self.base_delay).await
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            // Zero would mean the operation never runs.
            max_retries: config.max_retries.max(1),
            base_delay: config.base_delay_ms,
            timeout: config.transaction_timeout_ms,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_policy_always_allows_one_attempt() {
        let config = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&config).max_retries, 1);
    }

    #[tokio::test]
    async fn test_zero_retry_config_still_runs_once() {
        let config = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        let result = policy.run(|| async { Ok::<_, PlatformError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_backoff_timing() {
        let base = Duration::from_millis(1_000);
        let expected = [1_000u64, 2_000, 4_000, 8_000, 16_000];
        for (i, ms) in expected.iter().enumerate() {
            assert_eq!(backoff_delay(base, i as u32 + 1), Duration::from_millis(*ms));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_with_backoff() {
        let base = Duration::from_millis(1_000);
        let attempts = Arc::new(AtomicU32::new(0));
        let seen_at = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let result = execute_with_retry(
            || {
                let attempts = attempts.clone();
                let seen_at = seen_at.clone();
                async move {
                    seen_at.lock().unwrap().push(start.elapsed());
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(PlatformError::network("rpc unavailable"))
                    } else {
                        Ok("confirmed")
                    }
                }
            },
            3,
            base,
        )
        .await;

        assert_eq!(result.unwrap(), "confirmed");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let seen_at = seen_at.lock().unwrap().clone();
        assert_eq!(seen_at[0], Duration::ZERO);
        // base * 1 after the first failure, base * 2 after the second.
        assert_eq!(seen_at[1] - seen_at[0], base);
        assert_eq!(seen_at[2] - seen_at[1], base * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_propagates_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<()> = execute_with_retry(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(PlatformError::invalid_amount("zero"))
                }
            },
            5,
            Duration::from_millis(10),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_max_retries_exceeded() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<()> = execute_with_retry(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(PlatformError::network("still down"))
                }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.code, ErrorCode::MaxRetriesExceeded);
        assert!(!err.retryable);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
