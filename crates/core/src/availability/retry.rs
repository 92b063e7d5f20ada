//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use super::config::RetryConfig;
use super::types::{AvailabilityOutcome, CheckOutcome};
use crate::metrics;

/// Retry budget and backoff schedule for a check.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Duration,
}

impl RetryPolicy {
    /// A budget of `max_attempts` checks (at least one), sleeping
    /// `initial_delay * backoff_multiplier^(n-1)` after the n-th failure.
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_multiplier,
            max_delay: Duration::MAX,
        }
    }

    /// Caps every single delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after the `attempt`-th failed check (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs < 0.0 || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Run `check` until it succeeds, turns fatal, or the budget runs out.
    ///
    /// `check` receives the 1-based attempt number. Backoff uses
    /// `tokio::time::sleep`, so a waiting check never blocks other tasks.
    /// No delay follows the last attempt.
    pub async fn attempt<F, Fut>(&self, mut check: F) -> AvailabilityOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CheckOutcome>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = check(attempt).await;
            let checked_at = Utc::now();

            match outcome {
                CheckOutcome::Ok => {
                    return AvailabilityOutcome::Available {
                        attempts: attempt,
                        checked_at,
                    }
                }
                CheckOutcome::Fatal(failure) => {
                    return AvailabilityOutcome::Aborted {
                        attempts: attempt,
                        at: checked_at,
                        failure,
                    }
                }
                CheckOutcome::Retryable(failure) => {
                    if attempt >= self.max_attempts {
                        return AvailabilityOutcome::Exhausted {
                            attempts: attempt,
                            last_checked_at: checked_at,
                            last_failure: failure,
                        };
                    }

                    let delay = self.delay_for(attempt);
                    debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        reason = %failure,
                        "Check not satisfied, backing off"
                    );
                    metrics::RETRY_SLEEPS.inc();
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(
            config.max_attempts,
            Duration::from_secs(config.initial_delay_secs),
            config.backoff_multiplier,
        )
        .with_max_delay(Duration::from_secs(config.max_delay_secs))
    }
}
