//! MicroBatch - the engine facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::domain::Job;
use crate::error::{BuildError, RunError};
use crate::observability::RunSummary;
use crate::queue::{JobQueue, RetryPolicy};

use super::builder::{Config, MicroBatchBuilder};
use super::scheduler::{BatchScheduler, SchedulerState};
use super::shutdown::{Completion, ShutdownSignal};

/// Micro-batching engine.
///
/// Jobs are submitted one at a time; every `frequency` the run loop drains
/// up to `batch_size` of them and processes them in order. The first tick
/// that finds the queue empty ends the run and raises the completion signal.
///
/// # Example
/// ```ignore
/// let engine = Arc::new(MicroBatch::builder()
///     .batch_size(5)
///     .frequency(Duration::from_secs(2))
///     .processor(SquareProcessor)
///     .build()?);
///
/// engine.submit(Job::new(1, 3)).await;
///
/// let cancel = CancellationToken::new();
/// let runner = tokio::spawn({
///     let engine = Arc::clone(&engine);
///     async move { engine.run(&cancel).await }
/// });
///
/// engine.completion().wait().await;
/// let summary = runner.await??;
/// ```
pub struct MicroBatch {
    config: Config,
    retry_policy: RetryPolicy,
    queue: JobQueue,
    shutdown: ShutdownSignal,
    state: watch::Sender<SchedulerState>,
    running: AtomicBool,
}

impl MicroBatch {
    /// Engine with the default retry policy.
    pub fn new(config: Config) -> Result<Self, BuildError> {
        Self::with_retry_policy(config, RetryPolicy::default())
    }

    pub fn with_retry_policy(config: Config, retry_policy: RetryPolicy) -> Result<Self, BuildError> {
        config.validate()?;
        if retry_policy.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts);
        }

        let (state, _) = watch::channel(SchedulerState::Idle);
        Ok(Self {
            config,
            retry_policy,
            queue: JobQueue::new(),
            shutdown: ShutdownSignal::new(),
            state,
            running: AtomicBool::new(false),
        })
    }

    pub fn builder() -> MicroBatchBuilder {
        MicroBatchBuilder::new()
    }

    /// Add a job to the queue.
    ///
    /// Accepted after shutdown too, but nothing will drain it.
    pub async fn submit(&self, job: Job) {
        if self.shutdown.is_raised() {
            tracing::debug!(job_id = %job.id(), "job submitted after shutdown; it will not be processed");
        }
        self.queue.enqueue(job).await;
    }

    /// Drive the batch loop until the queue drains, `shutdown()` is called
    /// or `cancel` fires.
    ///
    /// Only one run may be active at a time; a concurrent second call fails
    /// with [`RunError::AlreadyRunning`].
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, RunError> {
        let _guard = RunGuard::acquire(&self.running)?;

        let scheduler = BatchScheduler {
            queue: &self.queue,
            processor: self.config.processor.as_ref(),
            retry_policy: &self.retry_policy,
            batch_size: self.config.batch_size,
            frequency: self.config.frequency,
            shutdown: &self.shutdown,
            state: &self.state,
        };
        Ok(scheduler.run(cancel).await)
    }

    /// Stop the engine. Returns `true` if this call raised the signal,
    /// `false` if it was already raised.
    ///
    /// A batch in progress is finished first; no further ticks are taken.
    pub fn shutdown(&self) -> bool {
        let raised = self.shutdown.raise();
        if raised {
            tracing::info!("shutdown requested");
        }
        raised
    }

    /// Handle that resolves once the engine has stopped.
    pub fn completion(&self) -> Completion {
        self.shutdown.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.len().await
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn frequency(&self) -> Duration {
        self.config.frequency
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

/// Marks the engine as running for the lifetime of one `run` call.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Result<Self, RunError> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RunError::AlreadyRunning)?;
        Ok(Self(running))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
