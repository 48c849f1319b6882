use thiserror::Error;

use crate::domain::JobId;

/// Failure reported by a [`Processor`](crate::ports::Processor) for one attempt.
///
/// Only `Retryable` asks the engine to try again; every other variant is
/// terminal for the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("retryable: {0}")]
    Retryable(String),

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("{0}")]
    Other(String),
}

impl ProcessError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable(message.into())
    }

    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::InvalidTask(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Terminal outcome of a job that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {job_id} failed: {source}")]
    NonRetryable { job_id: JobId, source: ProcessError },

    #[error("MAX_RETRY_EXCEEDED: job {job_id} failed {attempts} attempt(s), last error: {last_error}")]
    MaxRetryExceeded {
        job_id: JobId,
        attempts: u32,
        last_error: String,
    },

    #[error("job {job_id} cancelled before attempt {attempt}")]
    Cancelled { job_id: JobId, attempt: u32 },
}

impl JobError {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::NonRetryable { job_id, .. }
            | Self::MaxRetryExceeded { job_id, .. }
            | Self::Cancelled { job_id, .. } => *job_id,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Rejected engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("batch_size must be greater than zero")]
    InvalidBatchSize,

    #[error("frequency must be greater than zero and small enough to schedule")]
    InvalidFrequency,

    #[error("max_retry_attempts must be greater than zero")]
    InvalidMaxAttempts,

    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("the batch loop is already running on this engine")]
    AlreadyRunning,
}
