//! Bounded retry with exponential backoff.
//!
//! Each attempt reports an explicit outcome (success, transient failure,
//! permanent failure) consumed by a small retry loop. Sleeping goes
//! through the `Sleeper` seam so retry timing is testable without real
//! delays.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    Success(T),
    /// Worth retrying: timeouts, 5xx-class responses, rate limits.
    Transient(E),
    /// Not worth retrying: auth failures, malformed payloads.
    Permanent(E),
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Tokio-backed sleeper used outside tests.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given zero-based failed attempt: base * 2^attempt,
    /// capped at max_delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        exp.min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempt budget is
/// spent. Returns the final result together with the number of attempts
/// used.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> (Result<T, E>, u32)
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Attempt::Success(value) => return (Ok(value), attempt + 1),
            Attempt::Permanent(err) => return (Err(err), attempt + 1),
            Attempt::Transient(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return (Err(err), attempt);
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "Transient failure, retrying after backoff"
                );
                sleeper.sleep(delay).await;
            }
        }
    }
}
