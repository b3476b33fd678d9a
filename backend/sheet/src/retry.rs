use std::{fmt::Display, future::Future, time::Duration};

use tokio::time::sleep;
use tracing::warn;

/// Errors that may succeed when the same call is made again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Bounded exponential backoff: the delay doubles after every failed attempt
/// and never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial: Duration::from_millis(200),
            max: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            initial,
            max,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);

        self.initial.saturating_mul(factor).min(self.max)
    }

    pub fn should_retry<E: Transient>(&self, attempt: u32, error: &E) -> bool {
        attempt < self.attempts && error.is_transient()
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts. The last error is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if policy.should_retry(attempt, &e) => {
                let delay = policy.delay(attempt);
                warn!(
                    "{what} failed (attempt {attempt}/{}): {e}; retrying in {delay:?}",
                    policy.attempts
                );

                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
