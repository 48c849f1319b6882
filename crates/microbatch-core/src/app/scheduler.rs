//! BatchScheduler - tick ごとに drain して dispatch するループ
//!
//! # 学習ポイント
//! - `tokio::select!`（biased）で cancel / shutdown / tick を待ち分ける
//! - `MissedTickBehavior::Skip` で遅れた tick をまとめて消化しない
//! - batch ごとの tracing span（`Instrument`）

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::domain::{BatchId, Job, JobResult};
use crate::observability::{JobFailure, RunSummary, Termination};
use crate::ports::Processor;
use crate::queue::{JobQueue, RetryPolicy};

use super::executor::process_with_retry;
use super::shutdown::ShutdownSignal;

/// Where the run loop currently is.
///
/// State transitions:
/// - Idle -> Draining -> Dispatching -> Idle (one tick with work)
/// - Idle -> Draining -> Terminated (the tick found the queue empty)
/// - Idle -> Terminated (cancellation or shutdown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,

    /// Pulling up to `batch_size` jobs off the queue.
    Draining,

    /// Running the drained jobs one by one.
    Dispatching,

    /// The loop has exited. Absorbing.
    Terminated,
}

impl SchedulerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SchedulerState::Terminated)
    }
}

/// Borrowed view of the engine that one `run` call drives.
pub(crate) struct BatchScheduler<'a> {
    pub(crate) queue: &'a JobQueue,
    pub(crate) processor: &'a dyn Processor,
    pub(crate) retry_policy: &'a RetryPolicy,
    pub(crate) batch_size: usize,
    pub(crate) frequency: Duration,
    pub(crate) shutdown: &'a ShutdownSignal,
    pub(crate) state: &'a watch::Sender<SchedulerState>,
}

impl BatchScheduler<'_> {
    pub(crate) async fn run(&self, cancel: &CancellationToken) -> RunSummary {
        let started_at = Utc::now();
        let mut batches = 0;
        let mut results = Vec::new();
        let mut failures = Vec::new();

        let mut completion = self.shutdown.subscribe();

        // 最初の tick は frequency 後。遅い batch の後は tick を skip し、burst しない
        let mut ticker = interval_at(Instant::now() + self.frequency, self.frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            batch_size = self.batch_size,
            frequency_ms = self.frequency.as_millis() as u64,
            max_attempts = self.retry_policy.max_attempts,
            "microbatch started"
        );

        let termination = loop {
            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            if self.shutdown.is_raised() {
                break Termination::Shutdown;
            }
            self.set_state(SchedulerState::Idle);

            let stop = tokio::select! {
                biased;
                _ = cancel.cancelled() => Some(Termination::Cancelled),
                _ = completion.wait() => Some(Termination::Shutdown),
                _ = ticker.tick() => None,
            };
            if let Some(termination) = stop {
                break termination;
            }

            self.set_state(SchedulerState::Draining);
            let jobs = self.queue.dequeue(self.batch_size).await;
            if jobs.is_empty() {
                tracing::info!("successfully completed all accepted jobs");
                break Termination::Drained;
            }

            self.set_state(SchedulerState::Dispatching);
            batches += 1;
            let batch_id = BatchId::generate();
            let span = tracing::info_span!("batch", batch_id = %batch_id, size = jobs.len());
            self.dispatch(cancel, jobs, &mut results, &mut failures)
                .instrument(span)
                .await;
        };

        self.set_state(SchedulerState::Terminated);
        if self.shutdown.raise() {
            tracing::debug!(?termination, "shutdown signal raised");
        }

        let summary = RunSummary {
            termination,
            batches,
            results,
            failures,
            started_at,
            finished_at: Utc::now(),
        };
        let counts = summary.counts();
        tracing::info!(
            ?termination,
            batches = counts.batches,
            succeeded = counts.succeeded,
            failed = counts.failed,
            "microbatch stopped"
        );
        summary
    }

    /// Run each job through the retry executor, in drain order.
    ///
    /// A failed job is logged and dropped; its siblings still run.
    /// （1 件の失敗で batch 全体を止めない）
    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        jobs: Vec<Job>,
        results: &mut Vec<JobResult>,
        failures: &mut Vec<JobFailure>,
    ) {
        for job in jobs {
            match process_with_retry(cancel, self.processor, &job, self.retry_policy).await {
                Ok(result) => {
                    tracing::info!(
                        job_id = %job.id(),
                        task_input = %job.task(),
                        result = %result.result,
                        "job completed"
                    );
                    results.push(result);
                }
                Err(error) => {
                    tracing::error!(
                        job_id = %job.id(),
                        task_input = %job.task(),
                        error = %error,
                        status = "skipping",
                        "job failed"
                    );
                    failures.push(JobFailure {
                        job_id: job.id(),
                        error,
                    });
                }
            }
        }
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }
}
