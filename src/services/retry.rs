/// Retry with exponential backoff
use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Runs `operation` up to `max_attempts` times, doubling the delay each time
///
/// Only retryable errors (see [`AppError::is_retryable`]) trigger another attempt.
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    retry_with_backoff_if(operation, max_attempts, base_delay, AppError::is_retryable).await
}

/// Same as [`retry_with_backoff`] with a caller-supplied retry predicate
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    mut operation: F,
    max_attempts: u32,
    base_delay: Duration,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = base_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
