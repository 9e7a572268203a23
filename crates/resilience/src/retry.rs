//! Exponential backoff retry with jitter.
//!
//! Per §4.4: "Retry is exponential with base 1s and cap configurable; jitter
//! SHOULD be applied; retry only if the error is classified `retryable`
//! (HTTP 5xx, `ETIMEDOUT`, `ECONNRESET`). Non-retryable errors short-circuit."

use agentkern_common::ControlPlaneError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(30) }
    }
}

impl RetryConfig {
    /// Full-jitter exponential backoff: `rand(0, min(max_delay, base * 2^attempt))`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis().saturating_mul(1u128 << attempt.min(20));
        let capped = exp.min(self.max_delay.as_millis());
        let jittered = rand::rng().random_range(0..=capped.max(1));
        Duration::from_millis(jittered as u64)
    }
}

/// Run `op` up to `config.max_attempts` times, retrying only on errors the
/// shared taxonomy marks retryable (§7).
pub async fn retry_with_backoff<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, ControlPlaneError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ControlPlaneError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) };
        let result = retry_with_backoff(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(ControlPlaneError::Transient("boom".into())) } else { Ok(42) }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn short_circuits_non_retryable() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();
        let result: Result<(), _> = retry_with_backoff(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ControlPlaneError::Validation("bad input".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_max_attempts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { max_attempts: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2) };
        let result: Result<(), _> = retry_with_backoff(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ControlPlaneError::Timeout("slow".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
