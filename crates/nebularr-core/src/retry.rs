// ── Retry and backoff ──
//
// `RetryPolicy` bounds in-pass retries of read-only calls. `Backoff` spaces
// out whole reconciles of an object that keeps failing.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::context::Context;
use crate::error::AdapterError;

/// In-pass retry budget for read-only adapter calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the `attempt`-th failure (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        exponential(self.base_delay, self.max_delay, attempt.saturating_sub(1))
    }

    /// Run `op` inside `ctx`, retrying transient errors until the budget is
    /// spent. Non-transient errors and context expiry return at once.
    pub async fn run<T, F, Fut>(&self, ctx: &Context, op_name: &str, mut op: F) -> Result<T, AdapterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match ctx.run(op()).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() || attempt >= max => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    debug!(op = op_name, attempt, max, error = %e, ?delay, "retrying");
                    ctx.run(async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await?;
                    attempt += 1;
                }
            }
        }
    }
}

/// Requeue delay for an object after consecutive failed reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            max: Duration::from_secs(300),
        }
    }
}

impl Backoff {
    /// `base * 2^(failures-1)`, capped at `max`.
    pub fn delay(&self, failures: u32) -> Duration {
        exponential(self.base, self.max, failures.saturating_sub(1))
    }
}

fn exponential(base: Duration, max: Duration, exponent: u32) -> Duration {
    let factor = 2u32.checked_pow(exponent.min(31)).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(max, |d| d.min(max))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let b = Backoff::default();
        assert_eq!(b.delay(0), Duration::from_secs(5));
        assert_eq!(b.delay(1), Duration::from_secs(5));
        assert_eq!(b.delay(2), Duration::from_secs(10));
        assert_eq!(b.delay(4), Duration::from_secs(40));
        assert_eq!(b.delay(7), Duration::from_secs(300));
        assert_eq!(b.delay(200), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let value = RetryPolicy::default()
            .run(&Context::default(), "read", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AdapterError::Timeout { timeout_secs: 1 })
                } else {
                    Ok(9)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(&Context::default(), "read", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AdapterError::Unreachable {
                    url: "http://x".into(),
                    reason: "refused".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(&Context::default(), "read", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AdapterError::CredentialRejected {
                    message: "bad key".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::CredentialRejected { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
