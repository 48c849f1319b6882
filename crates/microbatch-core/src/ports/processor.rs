//! Processor port - job を 1 つ受け取り結果を 1 つ返す
//!
//! # 学習ポイント
//! - `async_trait` による object-safe な async trait（`Arc<dyn Processor>`）
//! - async closure への blanket impl

use std::future::Future;

use async_trait::async_trait;

use crate::domain::{Job, JobResult};
use crate::error::ProcessError;

/// A processor for submitted jobs.
///
/// The engine calls `process` for one job at a time, never concurrently, so
/// implementations do not need internal locking for the engine's sake.
///
/// Validating `job.task()` is the implementation's responsibility; a task of
/// the wrong shape should fail with [`ProcessError::InvalidTask`], which is
/// never retried. Return [`ProcessError::Retryable`] to ask for another attempt.
///
/// # Example
/// ```ignore
/// struct Square;
///
/// #[async_trait]
/// impl Processor for Square {
///     async fn process(&self, job: &Job) -> Result<JobResult, ProcessError> {
///         let n = job.task().as_i64().ok_or_else(|| ProcessError::invalid_task("not an integer"))?;
///         Ok(JobResult::new(job.id(), n * n))
///     }
/// }
/// ```
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, job: &Job) -> Result<JobResult, ProcessError>;
}

/// Async closures taking an owned `Job` are processors too.
#[async_trait]
impl<F, Fut> Processor for F
where
    F: Fn(Job) -> Fut + Send + Sync,
    Fut: Future<Output = Result<JobResult, ProcessError>> + Send + 'static,
{
    async fn process(&self, job: &Job) -> Result<JobResult, ProcessError> {
        self(job.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::JobId;

    struct Echo;

    #[async_trait]
    impl Processor for Echo {
        async fn process(&self, job: &Job) -> Result<JobResult, ProcessError> {
            Ok(JobResult::new(job.id(), job.task().clone()))
        }
    }

    #[tokio::test]
    async fn struct_processor_is_object_safe() {
        let processor: Arc<dyn Processor> = Arc::new(Echo);
        let result = processor.process(&Job::new(1, "hello")).await.unwrap();
        assert_eq!(result, JobResult::new(JobId::new(1), "hello"));
    }

    #[tokio::test]
    async fn closure_processor() {
        let processor: Arc<dyn Processor> = Arc::new(|job: Job| async move {
            match job.task().as_u64() {
                Some(n) => Ok(JobResult::new(job.id(), n + 1)),
                None => Err(ProcessError::invalid_task("expected an unsigned integer")),
            }
        });

        let ok = processor.process(&Job::new(1, 41)).await.unwrap();
        assert_eq!(ok.result, serde_json::json!(42));

        let err = processor.process(&Job::new(2, "x")).await.unwrap_err();
        assert!(matches!(err, ProcessError::InvalidTask(_)));
    }
}
