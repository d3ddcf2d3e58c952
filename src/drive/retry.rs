//! Retry Policy
//!
//! Bounded exponential backoff for remote reads. Only errors for which
//! [`DriveError::is_transient`] holds are retried; the last error is
//! surfaced once attempts run out.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DriveError, DriveResult};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Full jitter: sleep a uniform random duration in `[0, delay]`
    pub full_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            full_jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Same attempt budget with negligible delays
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            full_jitter: false,
        }
    }

    pub fn with_jitter(mut self) -> Self {
        self.full_jitter = true;
        self
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let base = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(retry as i32);
        let capped = base.min(self.max_delay.as_secs_f64()).max(0.0);

        if self.full_jitter && capped > 0.0 {
            Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..=capped))
        } else {
            Duration::from_secs_f64(capped)
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    /// Sleeping only suspends the calling task.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> DriveResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DriveResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.delay_for_retry(attempt - 1);
                    debug!(
                        "Retry {}/{} for '{}' after {:?} (error: {})",
                        attempt,
                        attempts - 1,
                        label,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("'{}' failed after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
