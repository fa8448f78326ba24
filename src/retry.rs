//! Bounded retry with a mandatory final attempt.
//!
//! [`execute`] runs a callback up to `max_retries_count` times, stopping as soon
//! as the predicate says the outcome is final, then runs it once more without
//! consulting the predicate. A policy of `N` retries therefore performs at most
//! `N + 1` calls, and the last result is returned as-is even when it failed.

use anyhow::Result;
use log::trace;
use std::future::Future;
use std::time::Duration;

use crate::clients::base::should_retry;

/// Number of predicate-guarded attempts before the final unconditional one.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries_count: usize,
    pub retry_interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries_count: usize, retry_interval: Duration) -> Self {
        Self {
            max_retries_count,
            retry_interval,
        }
    }

    /// Total number of callback invocations when every attempt is retryable.
    pub fn max_attempts(&self) -> usize {
        self.max_retries_count + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES, RETRY_INTERVAL)
    }
}

/// Runs `callback` until `should_retry` rejects an outcome or the budget runs out.
///
/// Attempts are strictly sequential. The sleep between attempts is awaited in
/// the caller's task and cannot be interrupted other than by dropping the
/// returned future.
pub async fn execute<T, F, Fut, P>(policy: RetryPolicy, callback: F, should_retry: P) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Result<T>) -> bool,
{
    for attempt in 1..=policy.max_retries_count {
        let result = callback().await;
        if !should_retry(&result) {
            return result;
        }

        if let Err(e) = &result {
            trace!(
                "attempt {}/{} failed ({}), retrying in {:?}...",
                attempt,
                policy.max_attempts(),
                e,
                policy.retry_interval
            );
        } else {
            trace!(
                "attempt {}/{} returned a retryable result, retrying in {:?}...",
                attempt,
                policy.max_attempts(),
                policy.retry_interval
            );
        }
        tokio::time::sleep(policy.retry_interval).await;
    }

    callback().await
}

/// [`execute`] with the shared status-class predicate from [`should_retry`].
pub async fn call_with_retry<T, F, Fut>(policy: RetryPolicy, callback: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    execute(policy, callback, |result: &Result<T>| {
        should_retry(result.as_ref().err())
    })
    .await
}
