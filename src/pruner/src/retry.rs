//! Bounded retry with exponential backoff for individual store calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use common::config::RetryConfig;

/// Delay before retry number `retry` (1-based).
pub fn backoff_delay(config: &RetryConfig, retry: u32) -> Duration {
    let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
    let factor = config.backoff_multiplier.powi(exponent);
    Duration::try_from_secs_f64(config.initial_delay.as_secs_f64() * factor)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Run `attempt` until it succeeds or `config.max_attempts` is spent.
///
/// The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut attempt: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt_no = 1;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt_no < max_attempts => {
                let delay = backoff_delay(config, attempt_no);
                tracing::debug!(
                    operation = %operation,
                    attempt = attempt_no,
                    max_attempts,
                    delay = ?delay,
                    error = %e,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt_no += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
