//! Bounded-retry combinator, generalized from the AI-provider retry policy.

use crate::errors::CareerEngineError;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry an async operation with exponential backoff, logging the outcome
/// of every attempt (spec.md §9: "each retry loop must log its outcome").
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    config: RetryConfig,
    context: &str,
) -> Result<T, CareerEngineError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, CareerEngineError>>,
{
    let mut last_error: Option<CareerEngineError> = None;
    let mut delay_ms = config.initial_delay_ms;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    log::info!("[{}] succeeded after {} retries", context, attempt);
                }
                return Ok(result);
            }
            Err(error) => {
                if !crate::errors::is_retryable(&error) {
                    log::warn!("[{}] non-retryable error: {}", context, error);
                    return Err(error);
                }

                last_error = Some(error.clone());

                if attempt >= config.max_retries {
                    log::warn!(
                        "[{}] exhausted {} attempts, last error: {}",
                        context,
                        attempt + 1,
                        error
                    );
                    break;
                }

                log::info!(
                    "[{}] attempt {}/{} failed: {}. Retrying in {}ms",
                    context,
                    attempt + 1,
                    config.max_retries + 1,
                    error,
                    delay_ms
                );

                sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = ((delay_ms as f64) * config.backoff_multiplier) as u64;
                delay_ms = delay_ms.min(config.max_delay_ms);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| CareerEngineError::Application("retry exhausted with no error".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let result = retry_with_backoff(|| async { Ok(42) }, fast_config(), "test").await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn succeeds_after_retries() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                let attempts = &attempts;
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(CareerEngineError::ExtractionPending)
                    } else {
                        Ok("done")
                    }
                }
            },
            fast_config(),
            "test",
        )
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_stops_immediately() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                let attempts = &attempts;
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(CareerEngineError::NoDefaultResume)
                }
            },
            fast_config(),
            "test",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
