use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential backoff policy for startup connections
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    /// Randomize each delay to 50–100% of its nominal value
    pub use_jitter: bool,
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Nominal delay before retry number `retry` (1-based), before jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// Run `operation` until it succeeds or the retry budget is spent.
///
/// The last error is returned unchanged so callers keep the original cause.
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if retry > 0 {
                    debug!(retries = retry, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if retry >= config.max_retries => {
                warn!(attempts = retry + 1, error = %e, "Giving up after repeated failures");
                return Err(e);
            }
            Err(e) => {
                retry += 1;
                let mut delay = config.delay_for(retry);
                if config.use_jitter {
                    delay = jitter(delay);
                }

                debug!(
                    retry,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Scale `delay` by a pseudo-random factor in [0.5, 1.0)
fn jitter(delay: Duration) -> Duration {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let factor = 0.5 + (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0;
    delay.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::new()
            .with_initial_delay(Duration::from_millis(5))
            .without_jitter()
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("connected")
                }
            },
            &fast(),
        )
        .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(format!("attempt {}", attempt + 1))
                    } else {
                        Ok("connected")
                    }
                }
            },
            &fast(),
        )
        .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("refused")
                }
            },
            &fast().with_max_retries(2),
        )
        .await;

        assert_eq!(result.unwrap_err(), "refused");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300));

        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(300));
        assert_eq!(config.delay_for(8), Duration::from_millis(300));
    }

    #[test]
    fn test_jitter_bounds() {
        let delay = Duration::from_millis(1000);
        for _ in 0..10 {
            let jittered = jitter(delay);
            assert!(jittered >= Duration::from_millis(500));
            assert!(jittered <= delay);
        }
    }
}
