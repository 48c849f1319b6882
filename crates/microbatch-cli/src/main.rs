use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use microbatch_core::observability::{self, LogFormat};
use microbatch_core::{
    Job, JobResult, MicroBatch, ProcessError, Processor, RunCounts, RunError, RunSummary,
    Termination,
};

#[derive(Parser, Debug)]
#[command(name = "microbatch")]
#[command(about = "Submit demo jobs to a micro-batching engine and run it until drained")]
struct Cli {
    /// Jobs drained per tick
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = 2000)]
    frequency_ms: u64,

    /// Attempts per job for retryable failures
    #[arg(long, default_value_t = 5)]
    max_retry_attempts: u32,

    /// Number of integer jobs to submit (one extra invalid job is always added)
    #[arg(long, default_value_t = 12)]
    jobs: u64,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

/// Squares integer tasks.
///
/// Job 4 always hits a (simulated) rate limit so the retry path is visible.
struct SquareProcessor;

const RATE_LIMITED_JOB: u64 = 4;

#[async_trait]
impl Processor for SquareProcessor {
    async fn process(&self, job: &Job) -> Result<JobResult, ProcessError> {
        let value = job
            .task()
            .as_i64()
            .ok_or_else(|| ProcessError::invalid_task(format!("expected integer, got {}", job.task())))?;

        if job.id().as_u64() == RATE_LIMITED_JOB {
            return Err(ProcessError::retryable("api limit reached"));
        }

        let square = value
            .checked_mul(value)
            .ok_or_else(|| ProcessError::other("square overflows i64"))?;
        Ok(JobResult::new(job.id(), square))
    }
}

#[derive(Debug, Serialize)]
struct Report {
    termination: Termination,
    counts: RunCounts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    observability::init(format, &cli.log_level);

    let engine = Arc::new(
        MicroBatch::builder()
            .batch_size(cli.batch_size)
            .frequency(Duration::from_millis(cli.frequency_ms))
            .processor(SquareProcessor)
            .max_retry_attempts(cli.max_retry_attempts)
            .build()?,
    );

    for i in 0..cli.jobs {
        engine.submit(Job::new(i, i)).await;
    }
    // A task of the wrong shape: reported once, never retried.
    engine.submit(Job::new(cli.jobs, "invalid")).await;
    info!(queued = engine.queue_len().await, "jobs submitted");

    let cancel = CancellationToken::new();
    let runner = tokio::spawn({
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        async move { engine.run(&cancel).await }
    });

    let summary = supervise(&engine, &cancel, runner, tokio::signal::ctrl_c).await?;
    let report = Report {
        termination: summary.termination,
        counts: summary.counts(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Wait for the run to finish.
///
/// 1 回目の interrupt は shutdown（現在の batch は最後まで処理する）、
/// 2 回目は cancel して retry 待ちの job も打ち切る。
async fn supervise<F, Fut>(
    engine: &MicroBatch,
    cancel: &CancellationToken,
    mut runner: JoinHandle<Result<RunSummary, RunError>>,
    mut interrupt: F,
) -> Result<RunSummary>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut completion = engine.completion();
    tokio::select! {
        _ = completion.wait() => {}
        res = interrupt() => {
            res?;
            warn!(reason = "user interrupt", "shutting down; interrupt again to cancel in-flight jobs");
            engine.shutdown();
        }
    }

    let summary = tokio::select! {
        joined = &mut runner => joined??,
        res = interrupt() => {
            res?;
            warn!(reason = "second interrupt", "cancelling in-flight jobs");
            cancel.cancel();
            runner.await??
        }
    };
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;

    use super::*;
    use microbatch_core::{Backoff, JobId};

    #[tokio::test]
    async fn squares_integer_tasks() {
        let result = SquareProcessor.process(&Job::new(3, 7)).await.unwrap();
        assert_eq!(result, JobResult::new(JobId::new(3), 49));
    }

    #[tokio::test]
    async fn rate_limited_job_is_retryable() {
        let err = SquareProcessor
            .process(&Job::new(RATE_LIMITED_JOB, 4))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn non_integer_task_is_invalid() {
        let err = SquareProcessor
            .process(&Job::new(12, "invalid"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidTask(_)));
    }

    fn spawn_run(
        engine: &Arc<MicroBatch>,
        cancel: &CancellationToken,
    ) -> JoinHandle<Result<RunSummary, RunError>> {
        let engine = Arc::clone(engine);
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run(&cancel).await })
    }

    /// Interrupts that fire after the given delays, in order.
    fn interrupts_after(
        delays: Vec<Duration>,
    ) -> impl FnMut() -> Pin<Box<dyn Future<Output = io::Result<()>> + Send>> {
        let mut delays = delays.into_iter();
        move || {
            let delay = delays.next().unwrap_or(Duration::from_secs(3600));
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(())
            })
        }
    }

    fn demo_engine() -> Arc<MicroBatch> {
        Arc::new(
            MicroBatch::builder()
                .batch_size(5)
                .frequency(Duration::from_secs(2))
                .processor(SquareProcessor)
                .max_retry_attempts(5)
                .backoff(Backoff::Exponential {
                    base_delay: Duration::from_secs(3600),
                    multiplier: 1.0,
                    max_delay: Duration::from_secs(3600),
                    jitter: false,
                })
                .build()
                .unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion_without_interrupt() {
        let engine = Arc::new(
            MicroBatch::builder()
                .batch_size(5)
                .frequency(Duration::from_secs(2))
                .processor(SquareProcessor)
                .build()
                .unwrap(),
        );
        engine.submit(Job::new(1, 1)).await;
        let cancel = CancellationToken::new();
        let runner = spawn_run(&engine, &cancel);

        let summary = supervise(&engine, &cancel, runner, interrupts_after(vec![]))
            .await
            .unwrap();

        assert_eq!(summary.termination, Termination::Drained);
        assert_eq!(summary.counts().succeeded, 1);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn second_interrupt_cancels_a_job_waiting_to_retry() {
        let engine = demo_engine();
        engine.submit(Job::new(RATE_LIMITED_JOB, 4)).await;
        let cancel = CancellationToken::new();
        let runner = spawn_run(&engine, &cancel);

        // Tick at 2s: job 4 fails and waits an hour to retry. Interrupts land
        // at 3s (shutdown) and 4s (cancel).
        let summary = supervise(
            &engine,
            &cancel,
            runner,
            interrupts_after(vec![Duration::from_secs(3), Duration::from_secs(1)]),
        )
        .await
        .unwrap();

        assert!(cancel.is_cancelled());
        assert_eq!(summary.termination, Termination::Cancelled);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].error.is_cancelled());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["microbatch"]);
        assert_eq!(cli.batch_size, 5);
        assert_eq!(cli.frequency_ms, 2000);
        assert_eq!(cli.max_retry_attempts, 5);
        assert!(!cli.json_logs);
    }
}
