//! Retry with exponential backoff and jitter
//!
//! Every call into a generative backend goes through `RetryExecutor::execute`.
//! All errors are retried until the attempt budget is spent; there is no
//! retryable/terminal distinction.

use crate::config::RetryConfig;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Default number of attempts per backend chain
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base delay in milliseconds (doubles after each failed attempt)
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default cap on a single delay in milliseconds
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
/// Jitter multiplies each delay by a factor drawn uniformly from this range
pub const JITTER_RANGE: std::ops::RangeInclusive<f64> = 0.5..=1.5;

/// Retry executor for fallible async operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryExecutor {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryExecutor {
    /// Create a new retry executor
    ///
    /// # Errors
    /// Returns an error if `max_attempts` is 0 or `base_delay` exceeds `max_delay`
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        jitter: bool,
    ) -> Result<Self, &'static str> {
        if max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        if base_delay > max_delay {
            return Err("base_delay cannot exceed max_delay");
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            jitter,
        })
    }

    /// Build an executor from validated configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            base_delay: Duration::from_millis(config.base_delay_ms()),
            max_delay: Duration::from_millis(config.max_delay_ms()),
            jitter: config.jitter(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }

    /// Delay after the failed attempt with zero-based index `attempt`, before jitter
    ///
    /// The formula is `min(base * 2^attempt, max)` with saturating arithmetic,
    /// so large attempt indices settle on the cap instead of overflowing.
    ///
    /// # Examples
    /// With base=1000ms, max=60000ms:
    /// - Attempt 0: 1,000ms
    /// - Attempt 1: 2,000ms
    /// - Attempt 2: 4,000ms
    /// - Attempt 6+: 60,000ms (capped)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let delay_ms = base_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(max_ms);
        Duration::from_millis(delay_ms)
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        let delay = self.calculate_backoff(attempt);
        if self.jitter {
            delay.mul_f64(rand::rng().random_range(JITTER_RANGE))
        } else {
            delay
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// `on_failure` runs once after every failed attempt, including the last,
    /// before any backoff sleep. Intermediate failures are logged and
    /// swallowed; the error of the final attempt is returned to the caller.
    pub async fn execute<T, E, Op, Fut, F>(
        &self,
        label: &str,
        mut operation: Op,
        mut on_failure: F,
    ) -> Result<T, E>
    where
        E: Display,
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        F: FnMut(&E),
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            operation = %label,
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    on_failure(&e);

                    if attempt + 1 >= self.max_attempts {
                        tracing::error!(
                            operation = %label,
                            max_attempts = self.max_attempts,
                            error = %e,
                            "All retry attempts exhausted"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        operation = %label,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Attempt failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter: true,
        }
    }
}
