//! Bounded retry and request pacing.
//!
//! Every retry in the scraper goes through one `RetryPolicy` value rather than
//! hand-written loops at each call site:
//! - day rendering (navigate / reload, wait, extract)
//! - detail expansion
//!
//! Only errors that report themselves as transient (`Retryable`) are retried.

use std::time::Duration;

use futures_util::future::BoxFuture;
use rand::Rng;
use tracing::warn;

use crate::error::Retryable;

/// Max attempts plus an exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay slept after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the target and the 1-based attempt number, so attempt-aware
    /// work (e.g. reload instead of navigate) stays inside the operation.
    pub async fn run<P, T, E, F>(&self, what: &str, target: &mut P, mut op: F) -> Result<T, E>
    where
        P: ?Sized + Send,
        E: Retryable + std::fmt::Display,
        F: for<'a> FnMut(&'a mut P, u32) -> BoxFuture<'a, Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(&mut *target, attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{what} failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Pause between day navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub base: Duration,
    /// Upper bound of a uniformly drawn extra delay.
    pub jitter: Duration,
}

impl Throttle {
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base + Duration::from_millis(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserError;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(2));
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1000));
        assert_eq!(p.backoff(3), Duration::from_millis(2000));
        assert_eq!(p.backoff(9), Duration::from_millis(2000));
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn throttle_stays_within_bounds() {
        let t = Throttle {
            base: Duration::from_millis(100),
            jitter: Duration::from_millis(50),
        };
        for _ in 0..50 {
            let d = t.next_delay();
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(150));
        }
        assert_eq!(Throttle::none().next_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let mut calls = 0u32;
        let out: Result<u32, BrowserError> = policy(3)
            .run("op", &mut calls, |calls, attempt| {
                Box::pin(async move {
                    *calls += 1;
                    if attempt < 3 {
                        Err(BrowserError::Timeout("table".to_string()))
                    } else {
                        Ok(attempt)
                    }
                })
            })
            .await;
        assert_eq!(out.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let mut calls = 0u32;
        let out: Result<(), BrowserError> = policy(3)
            .run("op", &mut calls, |calls, _| {
                Box::pin(async move {
                    *calls += 1;
                    Err(BrowserError::Stale("row".to_string()))
                })
            })
            .await;
        assert!(matches!(out, Err(BrowserError::Stale(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let mut calls = 0u32;
        let out: Result<(), BrowserError> = policy(3)
            .run("op", &mut calls, |calls, _| {
                Box::pin(async move {
                    *calls += 1;
                    Err(BrowserError::NotFound("link".to_string()))
                })
            })
            .await;
        assert!(out.is_err());
        assert_eq!(calls, 1);
    }
}
