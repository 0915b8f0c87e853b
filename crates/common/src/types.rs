//! Core data types for a Vigil run
//!
//! `Stats` is the live counter state mutated by workers; `RunSummary` is the
//! immutable report assembled from it once every task has been collected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// One unit of audit work, e.g. a repository address.
///
/// Equality is exact string match; no normalisation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What an agent hands back after a successful audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub session_id: String,
    /// Where the audit result file was written, when the invoker writes one.
    pub result_path: Option<PathBuf>,
}

impl AuditReport {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(session_id: S) -> Self {
        Self {
            session_id: session_id.into(),
            result_path: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_result_path(mut self, path: PathBuf) -> Self {
        self.result_path = Some(path);
        self
    }
}

/// Terminal state of one target's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    Success,
    Failed,
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskOutcome::Success => "success",
            TaskOutcome::Failed => "failed",
        })
    }
}

/// Result of one target's task, created once all attempts are over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub target: Target,
    pub outcome: TaskOutcome,
    pub error: Option<String>,
    pub session_id: Option<String>,
    pub duration: Duration,
    /// Index of the worker that ran the task; `None` when the task could not be collected.
    pub worker_id: Option<usize>,
}

impl TaskResult {
    #[must_use]
    pub fn success(target: Target, report: AuditReport, duration: Duration, worker_id: usize) -> Self {
        Self {
            target,
            outcome: TaskOutcome::Success,
            error: None,
            session_id: Some(report.session_id),
            duration,
            worker_id: Some(worker_id),
        }
    }

    #[must_use]
    pub fn failed(
        target: Target,
        error: String,
        duration: Duration,
        worker_id: Option<usize>,
    ) -> Self {
        Self {
            target,
            outcome: TaskOutcome::Failed,
            error: Some(error),
            session_id: None,
            duration,
            worker_id,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success)
    }
}

/// A batch of pending targets handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditJob {
    pub id: Uuid,
    pub targets: Vec<Target>,
}

impl AuditJob {
    #[inline]
    #[must_use]
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            id: Uuid::new_v4(),
            targets,
        }
    }

    #[inline]
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

/// Live run counters. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub total_duration: Duration,
    pub success_durations: Vec<Duration>,
    pub failed_durations: Vec<Duration>,
}

impl Stats {
    #[inline]
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Tasks not yet picked up by a worker.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.total
            .saturating_sub(self.completed + self.failed + self.in_progress)
    }

    /// Tasks that reached a terminal state.
    #[inline]
    #[must_use]
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }
}

/// Average/min/max of one outcome class, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub count: usize,
    pub average_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DurationStats {
    /// `None` when there are no samples.
    #[must_use]
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let secs = samples.iter().map(Duration::as_secs_f64);
        let sum: f64 = secs.clone().sum();
        let min = secs.clone().fold(f64::INFINITY, f64::min);
        let max = secs.fold(0.0_f64, f64::max);
        Some(Self {
            count: samples.len(),
            average_secs: sum / samples.len() as f64,
            min_secs: min,
            max_secs: max,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTarget {
    pub target: Target,
    pub error: String,
}

/// Final report of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub job_id: Option<Uuid>,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
    pub total_task_secs: f64,
    pub success: Option<DurationStats>,
    pub failure: Option<DurationStats>,
    /// Completed tasks per second of wall-clock time.
    pub throughput: f64,
    pub failures: Vec<FailedTarget>,
}

impl RunSummary {
    #[must_use]
    pub fn from_stats(stats: &Stats, elapsed: Duration, failures: Vec<FailedTarget>) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if stats.completed > 0 && elapsed_secs > 0.0 {
            stats.completed as f64 / elapsed_secs
        } else {
            0.0
        };
        Self {
            job_id: None,
            total: stats.total,
            completed: stats.completed,
            failed: stats.failed,
            elapsed_secs,
            total_task_secs: stats.total_duration.as_secs_f64(),
            success: DurationStats::from_samples(&stats.success_durations),
            failure: DurationStats::from_samples(&stats.failed_durations),
            throughput,
            failures,
        }
    }

    /// Summary of a run that had nothing to do.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_stats(&Stats::new(0), Duration::ZERO, Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn with_job_id(mut self, id: Uuid) -> Self {
        self.job_id = Some(id);
        self
    }

    #[inline]
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
