use std::time::Duration;

use tracing::warn;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("aborted without retry: {0}")]
    Aborted(E),
}

/// Run `operation` until it succeeds, hits a non-retryable error, or runs out of attempts.
///
/// `is_retryable` decides which errors are worth another attempt; `sleep` is called
/// with the backoff delay between attempts.
pub fn call_with_retry<T, E, Op, Classify, Sleep>(
    policy: &RetryPolicy,
    mut operation: Op,
    is_retryable: Classify,
    mut sleep: Sleep,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    Op: FnMut(u32) -> Result<T, E>,
    Classify: Fn(&E) -> bool,
    Sleep: FnMut(Duration),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if !is_retryable(&err) => return Err(RetryError::Aborted(err)),
            Err(err) if attempt >= max_attempts => {
                warn!(attempt, error = %err, "max retries reached");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying");
                sleep(delay);
                attempt += 1;
            }
        }
    }
}
