//! Run statistics shared by every worker

use std::time::Duration;
use tokio::sync::Mutex;

use vigil_common::Stats;

/// Counters and duration samples behind a single lock.
///
/// The lock only covers the counter update itself; callers never hold it
/// across an agent call or a backoff sleep. Each transition moves a task
/// between states inside one critical section, so a snapshot always sees
/// `completed + failed + in_progress + queued == total`.
pub struct StatsAggregator {
    inner: Mutex<Stats>,
}

impl StatsAggregator {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Mutex::new(Stats::new(total)),
        }
    }

    /// Pending -> InProgress. Returns `(position, total)` where position counts
    /// every task that has been picked up so far.
    pub async fn inc_in_progress(&self) -> (usize, usize) {
        let mut s = self.inner.lock().await;
        s.in_progress += 1;
        (s.finished() + s.in_progress, s.total)
    }

    /// InProgress -> Success. Returns `(finished, total)`.
    pub async fn record_success(&self, duration: Duration) -> (usize, usize) {
        let mut s = self.inner.lock().await;
        s.in_progress = s.in_progress.saturating_sub(1);
        s.completed += 1;
        s.total_duration += duration;
        s.success_durations.push(duration);
        (s.finished(), s.total)
    }

    /// InProgress -> Failed. Returns `(finished, total)`.
    pub async fn record_failure(&self, duration: Duration) -> (usize, usize) {
        let mut s = self.inner.lock().await;
        s.in_progress = s.in_progress.saturating_sub(1);
        s.failed += 1;
        s.total_duration += duration;
        s.failed_durations.push(duration);
        (s.finished(), s.total)
    }

    /// Consistent point-in-time copy.
    pub async fn snapshot(&self) -> Stats {
        self.inner.lock().await.clone()
    }
}
