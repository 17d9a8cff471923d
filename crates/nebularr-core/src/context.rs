// ── Cancellation and deadline scope ──
//
// Every adapter call runs inside a `Context`. Cancelling the token or
// passing the deadline aborts the in-flight call at its next await point.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl Context {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Child scope: cancelled with the parent, deadline at most `timeout` away.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let proposed = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < proposed => parent,
            _ => proposed,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancelled, or past the deadline.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The error a finished context reports.
    pub fn done_error(&self) -> AdapterError {
        if self.is_cancelled() {
            AdapterError::Cancelled
        } else {
            AdapterError::DeadlineExceeded
        }
    }

    /// Race `fut` against cancellation and the deadline.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, AdapterError>
    where
        F: Future<Output = Result<T, AdapterError>>,
    {
        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(AdapterError::Cancelled),
            () = expiry => Err(AdapterError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_inner_result() {
        let ctx = Context::default();
        let value = ctx.run(async { Ok::<_, AdapterError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_context_aborts() {
        let ctx = Context::default();
        ctx.cancel();
        let err = ctx
            .run(std::future::pending::<Result<(), AdapterError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Cancelled));
        assert!(ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_slow_call() {
        let ctx = Context::default().child_with_timeout(Duration::from_secs(1));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, AdapterError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::DeadlineExceeded));
    }

    #[test]
    fn child_inherits_cancellation() {
        let parent = Context::default();
        let child = parent.child_with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(child.done_error(), AdapterError::Cancelled));
    }
}
