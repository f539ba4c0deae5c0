//! Bounded retry with exponential backoff.
//!
//! Network fetches and Reasoner calls are the only operations that may
//! block. Both go through [`retry`], which re-runs an operation only while
//! its error [is transient](crate::ScoutError::is_transient).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::Result;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub attempts: u32,
    /// Delay before the second attempt; doubled for every further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, base_delay: Duration::from_millis(500) }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    pub fn none() -> Self {
        Self { attempts: 1, base_delay: Duration::ZERO }
    }

    /// A policy with the given attempt count and no delay. Used by tests and
    /// stubbed collaborators.
    pub fn immediate(attempts: u32) -> Self {
        Self { attempts, base_delay: Duration::ZERO }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Run `op` until it succeeds, fails with a permanent error, or the policy
/// runs out of attempts. The last error is returned on exhaustion.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && err.is_transient() => {
                let delay = policy.delay_after(attempt);
                warn!(%label, attempt, ?delay, error = %err, "transient failure, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoutError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy { attempts: 4, base_delay: Duration::from_millis(100) };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry(RetryPolicy::immediate(3), "op", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 { Err(ScoutError::transient("flaky")) } else { Ok(n) }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(RetryPolicy::immediate(2), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScoutError::transient("still down"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(RetryPolicy::immediate(5), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScoutError::InvalidInput("bad".into()))
        })
        .await;

        assert!(matches!(result, Err(ScoutError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
