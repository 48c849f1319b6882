//! Run reporting and logging setup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::domain::{JobId, JobResult};
use crate::error::JobError;

/// Why a run loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A tick found the queue empty.
    Drained,

    /// `shutdown()` was called.
    Shutdown,

    /// The run's cancellation token fired.
    Cancelled,
}

/// A job that ended without a result. It is not retried again.
#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    pub job_id: JobId,
    pub error: JobError,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Everything one call to `run` produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub termination: Termination,
    pub batches: usize,
    pub results: Vec<JobResult>,
    pub failures: Vec<JobFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            batches: self.batches,
            succeeded: self.results.len(),
            failed: self.failures.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_level`. Safe to call more than once;
/// later calls are no-ops.
pub fn init(format: LogFormat, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
