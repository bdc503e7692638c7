//! Fixed-interval retry for bootstrap operations
//!
//! Bootstrap work runs while the services it talks to may still be starting.
//! Every failure is retried after the same fixed sleep; by default there is
//! no attempt limit and the process supervisor is the only way out.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default sleep between bootstrap attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Sleep between a failed attempt and the next one
    pub interval: Duration,

    /// Maximum number of retries (not including the initial attempt).
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::unbounded(DEFAULT_RETRY_INTERVAL)
    }
}

impl RetryConfig {
    /// Retry forever with a fixed interval
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_retries: None,
        }
    }

    /// Retry at most `max_retries` times with a fixed interval
    pub fn bounded(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries: Some(max_retries),
        }
    }

    fn exhausted(&self, retries: u32) -> bool {
        self.max_retries.is_some_and(|max| retries >= max)
    }
}

/// Execute an async operation, retrying every failure.
///
/// Returns the first success, or the last error once `max_retries` is
/// reached. With an unbounded config this only returns on success.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retries > 0 {
                    debug!(
                        operation = operation_name,
                        attempts = retries + 1,
                        "Operation succeeded after retrying"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if config.exhausted(retries) {
                    warn!(
                        operation = operation_name,
                        attempts = retries + 1,
                        "Operation failed after {} attempts: {}",
                        retries + 1,
                        e
                    );
                    return Err(e);
                }

                warn!(
                    operation = operation_name,
                    attempt = retries + 1,
                    retry_in_secs = config.interval.as_secs_f64(),
                    "{} failed, will try again: {}",
                    operation_name,
                    e
                );

                sleep(config.interval).await;
                retries += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[derive(Debug)]
    struct TestError;

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection refused")
        }
    }

    #[test]
    fn test_default_is_unbounded_ten_seconds() {
        let config = RetryConfig::default();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.max_retries, None);
        assert!(!config.exhausted(u32::MAX));
    }

    #[tokio::test]
    async fn test_retry_succeeds_eventually() {
        let config = RetryConfig::unbounded(Duration::from_millis(20));
        let mut attempts = 0;
        let started = Instant::now();

        let result: Result<&str, TestError> = with_retry(&config, "test", || {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 3 {
                    Err(TestError)
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempts, 3);
        // Two failures, two fixed sleeps
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_bounded_retry_gives_up() {
        let config = RetryConfig::bounded(Duration::from_millis(1), 2);
        let mut attempts = 0;

        let result: Result<(), TestError> = with_retry(&config, "test", || {
            attempts += 1;
            async { Err(TestError) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 3); // Initial + 2 retries
    }

    #[tokio::test]
    async fn test_first_success_does_not_sleep() {
        let config = RetryConfig::unbounded(Duration::from_secs(3600));
        let mut attempts = 0;

        let result: Result<u8, TestError> = with_retry(&config, "test", || {
            attempts += 1;
            async { Ok(7) }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts, 1);
    }
}
