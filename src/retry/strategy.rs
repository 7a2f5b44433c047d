// src/retry/strategy.rs

use crate::config::MonitorConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn from_monitor(monitor: &MonitorConfig) -> Self {
        Self {
            max_attempts: monitor.retries.saturating_add(1),
            backoff_base: monitor.retry_backoff(),
            backoff_max: MAX_BACKOFF,
        }
    }
}

#[derive(Debug)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

#[derive(Debug, Clone)]
pub struct RetryStrategy {
    policy: RetryPolicy,
}

impl RetryStrategy {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Execute a function with retry logic
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.execute_with_decision(f, |_| RetryDecision::Retry).await
    }

    /// Execute with custom retry decision logic
    pub async fn execute_with_decision<F, Fut, T, E>(
        &self,
        mut f: F,
        should_retry: impl Fn(&E) -> RetryDecision,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match f().await {
                Ok(result) => return Ok(result),
                Err(error) => match should_retry(&error) {
                    RetryDecision::NoRetry => {
                        debug!("Error is non-retryable: {}", error);
                        return Err(error);
                    }
                    RetryDecision::Retry => {
                        if attempt >= max_attempts {
                            if max_attempts > 1 {
                                warn!("Retry failed after {} attempts: {}", attempt, error);
                            }
                            return Err(error);
                        }

                        let backoff = self.calculate_backoff(attempt);
                        debug!(
                            "Attempt {} failed: {}. Retrying in {:?}",
                            attempt, error, backoff
                        );

                        sleep(backoff).await;
                    }
                },
            }
        }
    }

    /// Calculate exponential backoff with jitter
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.policy.backoff_base.as_millis() as u64;
        let max = self.policy.backoff_max.as_millis() as u64;

        // base * 2^(attempt - 1)
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(max);

        // 0-25% jitter
        let jitter = (capped as f64 * rand::random::<f64>() * 0.25) as u64;

        Duration::from_millis(capped + jitter)
    }
}
