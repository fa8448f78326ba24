use anyhow::Result;
use std::future::Future;

use crate::retry::{RetryPolicy, call_with_retry};

/// Wraps a protocol client so that every remote operation is retried.
///
/// The protocol modules implement their operations trait for
/// `Retryable<C>` whenever `C` implements it, so callers cannot tell a
/// plain client from a resilient one.
pub struct Retryable<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> Retryable<C> {
    pub fn new(inner: C) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    pub fn with_policy(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs one operation of the wrapped client under the retry policy.
    pub(crate) async fn retry<'a, T, F, Fut>(&'a self, operation: F) -> Result<T>
    where
        F: Fn(&'a C) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        call_with_retry(self.policy, || operation(&self.inner)).await
    }
}
