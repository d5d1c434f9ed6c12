use crate::shared::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff with jitter, parameterized only by the error taxonomy.
/// Knows nothing about HTTP or storage; the token manager and the pipeline
/// facade both wrap their operations in the same policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    /// Jitter fraction applied symmetrically around the computed delay.
    jitter: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            jitter: 0.2,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// `min(initial * 2^(attempt-1) + jitter, max)` for 1-based attempts.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let base = self.initial_delay.as_millis() as u64;
        let exponential = base.saturating_mul(1_u64 << shift);

        let spread = exponential as f64 * self.jitter;
        let jittered = if spread > 0.0 {
            let offset = rand::thread_rng().gen_range(-spread..=spread);
            (exponential as f64 + offset).max(0.0) as u64
        } else {
            exponential
        };

        Duration::from_millis(jittered.min(self.max_delay.as_millis() as u64))
    }

    /// Runs `operation` up to `max_retries` times, sleeping between attempts.
    /// Non-retryable errors and the final failure are returned as-is.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= self.max_retries => return Err(err),
                Err(err) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        target: "sync::retry",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_millis(10_000))
    }
}
