//! Bounded polling for fallible storage calls.
//!
//! [`RetryPolicy::poll_until_success`] runs an attempt immediately and then
//! once per interval until it succeeds, fails terminally, or the deadline
//! passes. Waiting uses `tokio::time::sleep`, so other tasks sharing the
//! runtime keep running while a call backs off.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default overall deadline of a retried call.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The attempt produced a value; stop polling.
    Success(T),
    /// The attempt failed in a way that may clear up; poll again.
    Retryable(E),
    /// The attempt failed for a logical reason; stop polling.
    Terminal(E),
}

/// Fixed-interval retry with an overall deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between consecutive attempts.
    pub interval: Duration,
    /// Time after the first attempt at which polling stops.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            timeout: DEFAULT_RETRY_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given interval and deadline.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Polls `attempt` until it yields [`Outcome::Success`] or
    /// [`Outcome::Terminal`], or until `timeout` has elapsed since the first
    /// attempt.
    ///
    /// `operation` names the call in log output only.
    ///
    /// # Errors
    ///
    /// Returns the error of a terminal outcome as soon as it is observed, or
    /// the error of the last retryable outcome once the deadline has passed.
    pub async fn poll_until_success<T, E, F, Fut>(
        &self,
        operation: &str,
        mut attempt: F,
    ) -> Result<T, E>
    where
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let err = match attempt().await {
                Outcome::Success(value) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Outcome::Terminal(err) => return Err(err),
                Outcome::Retryable(err) => err,
            };

            let now = Instant::now();
            if now >= deadline {
                warn!(operation, attempts, error = %err, "retry deadline exceeded");
                return Err(err);
            }
            warn!(operation, attempt = attempts, error = %err, "attempt failed, retrying");
            tokio::time::sleep(self.interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(10), Duration::from_millis(50))
    }

    #[test]
    fn default_policy_is_one_second_over_ten() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_does_not_wait() {
        let start = Instant::now();
        let mut calls = 0;
        let result: Result<u32, String> = policy()
            .poll_until_success("test", || {
                calls += 1;
                async { Outcome::Success(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let mut calls = 0;
        let result: Result<&str, String> = policy()
            .poll_until_success("test", || {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Outcome::Retryable(format!("failure {n}"))
                    } else {
                        Outcome::Success("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_deadline_returns_last_failure() {
        let start = Instant::now();
        let mut calls = 0;
        let result: Result<(), String> = policy()
            .poll_until_success("test", || {
                calls += 1;
                let n = calls;
                async move { Outcome::Retryable(format!("failure {n}")) }
            })
            .await;
        // Attempts at 0, 10, 20, 30, 40 and 50 ms.
        assert_eq!(calls, 6);
        assert_eq!(result.unwrap_err(), "failure 6");
        assert_eq!(start.elapsed(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_short_circuits() {
        let mut calls = 0;
        let result: Result<(), String> = policy()
            .poll_until_success("test", || {
                calls += 1;
                async { Outcome::Terminal("not found".to_string()) }
            })
            .await;
        assert_eq!(result.unwrap_err(), "not found");
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_after_retries_is_returned_as_is() {
        let mut calls = 0;
        let result: Result<(), String> = policy()
            .poll_until_success("test", || {
                calls += 1;
                let n = calls;
                async move {
                    if n == 1 {
                        Outcome::Retryable("flaky".to_string())
                    } else {
                        Outcome::Terminal("conflict".to_string())
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap_err(), "conflict");
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn single_attempt_policy_never_retries() {
        let mut calls = 0;
        let result: Result<(), String> = RetryPolicy::single_attempt()
            .poll_until_success("test", || {
                calls += 1;
                async { Outcome::Retryable("down".to_string()) }
            })
            .await;
        assert_eq!(result.unwrap_err(), "down");
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_wait_is_clipped_to_deadline() {
        let start = Instant::now();
        let policy = RetryPolicy::new(Duration::from_millis(30), Duration::from_millis(50));
        let mut calls = 0;
        let _: Result<(), String> = policy
            .poll_until_success("test", || {
                calls += 1;
                async { Outcome::Retryable("down".to_string()) }
            })
            .await;
        // Attempts at 0, 30 and 50 ms.
        assert_eq!(calls, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(50));
    }
}
