//! Retry policy with linear backoff

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use vigil_common::{AuditInvoker, AuditReport, Target};

/// Bounded retries around a single target's audit.
///
/// Attempt `k` failing (with `k < max_attempts`) blocks the caller for
/// `k * backoff_unit` before attempt `k + 1`: 2s, 4s, 6s... with the default
/// unit. Every error is retried the same way. When the last attempt fails,
/// its error is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 2;
    pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(2);

    /// `max_retries` is the total number of attempts; values below 1 are raised to 1.
    pub fn new(max_retries: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_retries.max(1),
            backoff_unit,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds or attempts run out. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, target: &Target, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    let wait = self.backoff_for(attempt);
                    warn!(
                        "⚠ attempt {} failed, retrying in {}s: {} - {:#}",
                        attempt,
                        wait.as_secs_f64(),
                        target,
                        e
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Audit `target` through `invoker` under this policy.
    pub async fn attempt(&self, invoker: &dyn AuditInvoker, target: &Target) -> Result<AuditReport> {
        self.run(target, |_| invoker.audit(target)).await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_BACKOFF_UNIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(6));
    }

    #[test]
    fn zero_retries_still_attempts_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_grow_linearly_between_attempts() {
        let policy = RetryPolicy::new(4, Duration::from_secs(2));
        let mut stamps = Vec::new();

        let result: Result<&str> = policy
            .run(&Target::new("t"), |attempt| {
                stamps.push(Instant::now());
                async move {
                    if attempt <= 3 {
                        Err(anyhow!("transient {attempt}"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(stamps.len(), 4);
        let expected = [2u64, 4, 6];
        for (pair, secs) in stamps.windows(2).zip(expected) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(secs), "gap {gap:?} < {secs}s");
            assert!(gap < Duration::from_secs(secs) + Duration::from_millis(50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_surface_last_error() {
        let policy = RetryPolicy::new(2, Duration::from_secs(2));
        let calls = AtomicU32::new(0);

        let err = policy
            .run(&Target::new("t4"), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(anyhow!("failure on attempt {attempt}")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.to_string(), "failure on attempt 2");
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_does_not_sleep() {
        let policy = RetryPolicy::default();
        let start = Instant::now();
        let v = policy
            .run(&Target::new("t"), |_| async { Ok::<_, anyhow::Error>(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
