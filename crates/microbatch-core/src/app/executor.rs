//! Retry executor - RetryPolicy に従って 1 つの job を処理する
//!
//! # 学習ポイント
//! - エラーの種類（retryable / それ以外）で分岐する
//! - `CancellationToken` で backoff 待ちを中断できるようにする

use tokio_util::sync::CancellationToken;

use crate::domain::{Job, JobResult};
use crate::error::{JobError, ProcessError};
use crate::ports::Processor;
use crate::queue::RetryPolicy;

/// Process `job`, retrying retryable failures up to `policy.max_attempts`.
///
/// # Flow
/// 1. Check `cancel`; a cancelled run makes no further attempts.
/// 2. Call the processor.
/// 3. Success returns. A non-retryable error returns immediately.
/// 4. A retryable error waits `policy.next_delay(attempt)` (zero by default)
///    and loops.
///
/// Cancellation is only observed between attempts, never mid-call.
pub async fn process_with_retry(
    cancel: &CancellationToken,
    processor: &dyn Processor,
    job: &Job,
    policy: &RetryPolicy,
) -> Result<JobResult, JobError> {
    let job_id = job.id();
    let mut last_error: Option<ProcessError> = None;

    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled { job_id, attempt });
        }

        match processor.process(job).await {
            Ok(result) => {
                tracing::debug!(job_id = %job_id, attempt, "attempt succeeded");
                return Ok(result);
            }
            Err(err @ ProcessError::Retryable(_)) => {
                tracing::warn!(
                    job_id = %job_id,
                    task_input = %job.task(),
                    error = %err,
                    error_type = "retryable",
                    status = "retrying",
                    attempt,
                    max_attempts = policy.max_attempts,
                    "job attempt failed"
                );
                last_error = Some(err);

                let delay = policy.next_delay(attempt);
                if !delay.is_zero() && attempt < policy.max_attempts {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(JobError::Cancelled { job_id, attempt: attempt + 1 });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
            Err(err @ (ProcessError::InvalidTask(_) | ProcessError::Other(_))) => {
                return Err(JobError::NonRetryable {
                    job_id,
                    source: err,
                });
            }
        }
    }

    Err(JobError::MaxRetryExceeded {
        job_id,
        attempts: policy.max_attempts,
        last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}
