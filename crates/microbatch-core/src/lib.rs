//! microbatch-core
//!
//! In-process micro-batching: jobs are submitted one at a time, and on a
//! fixed cadence the engine drains up to `batch_size` of them and hands each
//! to a caller-supplied [`Processor`], retrying transient failures.
//!
//! # Modules
//! - **domain**: Job, JobResult, ids
//! - **queue**: FIFO job queue + RetryPolicy
//! - **ports**: the Processor trait
//! - **app**: engine facade, builder, scheduler, retry executor, shutdown signal
//! - **observability**: run summary + tracing setup
//! - **error**: error types

pub mod app;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::{Completion, Config, MicroBatch, MicroBatchBuilder, SchedulerState};
pub use domain::{BatchId, Job, JobId, JobResult};
pub use error::{BuildError, JobError, ProcessError, RunError};
pub use observability::{JobFailure, RunCounts, RunSummary, Termination};
pub use ports::Processor;
pub use queue::{Backoff, DEFAULT_MAX_ATTEMPTS, JobQueue, RetryPolicy};
