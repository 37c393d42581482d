//! Bounded retry with exponential backoff.
//!
//! The decision is a pure function of the attempt number and the current delay, so the policy
//! is testable without timers. `retry_with_backoff` is the thin async loop around it.

use std::{fmt::Display, future::Future, time::Duration};

use tokio::time::sleep;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const BACKOFF_MULTIPLIER: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `wait`, then try again; the attempt after that waits `next_delay`.
    Retry { wait: Duration, next_delay: Duration },
    GiveUp,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; it is clamped to at least 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: BACKOFF_MULTIPLIER,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Decide what to do after `attempt` (1-based) failed while the backoff stood at
    /// `current_delay`.
    pub fn decide<E>(&self, attempt: u32, current_delay: Duration, _err: &E) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            wait: current_delay,
            next_delay: current_delay.saturating_mul(self.multiplier),
        }
    }

    /// Full wait schedule for a run where every attempt fails.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut out = Vec::new();
        let mut delay = self.base_delay;
        let mut attempt = 1;
        while let RetryDecision::Retry { wait, next_delay } = self.decide(attempt, delay, &()) {
            out.push(wait);
            delay = next_delay;
            attempt += 1;
        }
        out
    }
}

/// Run `op` until it succeeds or the policy gives up; the last error is returned.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    let mut delay = policy.base_delay;
    loop {
        let err = match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        match policy.decide(attempt, delay, &err) {
            RetryDecision::GiveUp => return Err(err),
            RetryDecision::Retry { wait, next_delay } => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    retry_in_ms = wait.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                sleep(wait).await;
                delay = next_delay;
                attempt += 1;
            }
        }
    }
}
