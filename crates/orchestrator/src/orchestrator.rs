// crates/orchestrator/src/orchestrator.rs
//! Orchestrator - worker pool, ledger writes and run summary

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, instrument};

use vigil_common::{
    AuditInvoker, AuditJob, AuditReport, FailedTarget, RunSummary, Target, TaskResult, VigilError,
};
use crate::ledger::CompletionLedger;
use crate::retry::RetryPolicy;
use crate::stats::StatsAggregator;

/// Orchestrator drives every pending target through the retry policy on a
/// fixed pool of workers, records successes in the ledger and collects stats.
pub struct Orchestrator {
    invoker: Arc<dyn AuditInvoker>,
    ledger: Arc<CompletionLedger>,
    retry: RetryPolicy,
    max_workers: usize,
}

impl Orchestrator {
    pub const DEFAULT_MAX_WORKERS: usize = 3;

    /// Create an orchestrator with the default pool size and retry policy.
    pub fn new(invoker: Arc<dyn AuditInvoker>, ledger: Arc<CompletionLedger>) -> Self {
        Self {
            invoker,
            ledger,
            retry: RetryPolicy::default(),
            max_workers: Self::DEFAULT_MAX_WORKERS,
        }
    }

    /// Set the number of concurrent workers.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run every target of `job` to a terminal state and summarise.
    ///
    /// Blocks until each target has produced a result; there is no overall
    /// deadline. A failing target never aborts its siblings.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn run(&self, job: AuditJob) -> Result<RunSummary> {
        if self.max_workers == 0 {
            return Err(VigilError::Config("max workers must be at least 1".into()).into());
        }

        let job_id = job.id;
        let total = job.target_count();
        let stats = Arc::new(StatsAggregator::new(total));
        if total == 0 {
            info!("Job {} has no pending targets", job_id);
            return Ok(RunSummary::empty().with_job_id(job_id));
        }

        info!(
            "Starting job {} invoker={} targets={} workers={} attempts={}",
            job_id,
            self.invoker.name(),
            total,
            self.max_workers,
            self.retry.max_attempts()
        );

        // Shared queue pattern: every worker pops the next target until empty.
        let queue = Arc::new(Mutex::new(VecDeque::from(job.targets)));
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskResult>();
        let run_start = Instant::now();

        let mut workers = Vec::with_capacity(self.max_workers);
        for worker_id in 0..self.max_workers {
            let worker = Worker {
                id: worker_id,
                queue: queue.clone(),
                invoker: self.invoker.clone(),
                ledger: self.ledger.clone(),
                retry: self.retry,
                stats: stats.clone(),
                results: tx.clone(),
            };
            workers.push(tokio::spawn(worker.run()));
        }
        drop(tx);

        // Wait for workers to drain the queue
        for w in workers {
            w.await.context("worker task aborted")?;
        }

        let mut failures = Vec::new();
        while let Some(result) = rx.recv().await {
            if let Some(error) = result.error {
                failures.push(FailedTarget {
                    target: result.target,
                    error,
                });
            }
        }

        let elapsed = run_start.elapsed();
        let snapshot = stats.snapshot().await;
        Ok(RunSummary::from_stats(&snapshot, elapsed, failures).with_job_id(job_id))
    }
}

/// One pool member. Owns handles to the shared run state, never the state itself.
struct Worker {
    id: usize,
    queue: Arc<Mutex<VecDeque<Target>>>,
    invoker: Arc<dyn AuditInvoker>,
    ledger: Arc<CompletionLedger>,
    retry: RetryPolicy,
    stats: Arc<StatsAggregator>,
    results: mpsc::UnboundedSender<TaskResult>,
}

impl Worker {
    async fn run(self) {
        loop {
            let maybe_target = {
                let mut q = self.queue.lock().await;
                q.pop_front()
            };

            let target = match maybe_target {
                Some(t) => t,
                None => break, // queue empty, exit worker
            };

            let result = self.process(target).await;
            if self.results.send(result).is_err() {
                break;
            }
        }
    }

    async fn process(&self, target: Target) -> TaskResult {
        let (current, total) = self.stats.inc_in_progress().await;
        info!("[worker-{}] [{}/{}] starting: {}", self.id, current, total, target);
        let started = Instant::now();

        // The attempt sequence runs in its own task so a panic inside it is
        // caught here instead of taking the worker down.
        let handle = tokio::spawn(audit_and_record(
            self.invoker.clone(),
            self.ledger.clone(),
            self.retry,
            target.clone(),
        ));

        let result = match handle.await {
            Ok(Ok(report)) => TaskResult::success(target, report, started.elapsed(), self.id),
            Ok(Err(e)) => {
                TaskResult::failed(target, format!("{:#}", e), started.elapsed(), Some(self.id))
            }
            Err(join_err) => {
                let err = VigilError::Collection(join_err.to_string());
                error!("✗ {}: {}", target, err);
                TaskResult::failed(target, err.to_string(), started.elapsed(), None)
            }
        };

        if result.is_success() {
            let (finished, total) = self.stats.record_success(result.duration).await;
            info!(
                "[worker-{}] [{}/{}] ✓ completed: {} (session: {})",
                self.id,
                finished,
                total,
                result.target,
                result.session_id.as_deref().unwrap_or("N/A")
            );
        } else {
            let (finished, total) = self.stats.record_failure(result.duration).await;
            error!(
                "[worker-{}] [{}/{}] ✗ failed: {} - {}",
                self.id,
                finished,
                total,
                result.target,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        result
    }
}

/// Attempt sequence for one target; the ledger is only written once the audit succeeded.
async fn audit_and_record(
    invoker: Arc<dyn AuditInvoker>,
    ledger: Arc<CompletionLedger>,
    retry: RetryPolicy,
    target: Target,
) -> Result<AuditReport> {
    let report = retry.attempt(invoker.as_ref(), &target).await?;
    ledger
        .append(&target)
        .await
        .with_context(|| format!("audit succeeded but ledger write failed for {}", target))?;
    Ok(report)
}
