//! Queue module: the FIFO holding area for submitted jobs, and the retry
//! policy the engine applies when draining it.

mod retry;

pub use retry::{Backoff, DEFAULT_MAX_ATTEMPTS, RetryPolicy};

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::domain::{Job, JobId};

/// In-memory, unbounded, first-in-first-out job queue.
///
/// Design:
/// - One lock guards the whole structure; it is held for the duration of a
///   single `enqueue` / `dequeue` / `len` call and never across processing.
/// - Jobs come out in exactly the order they went in.
/// - A job is handed out by at most one `dequeue` call.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a job at the tail.
    pub async fn enqueue(&self, job: Job) {
        let mut jobs = self.jobs.lock().await;
        tracing::trace!(job_id = %job.id(), "enqueue");
        jobs.push_back(job);
    }

    /// Remove up to `n` jobs from the head, oldest first.
    ///
    /// Returns fewer than `n` (possibly none) when fewer are queued. Only
    /// jobs present when the lock is taken can be returned.
    pub async fn dequeue(&self, n: usize) -> Vec<Job> {
        let mut jobs = self.jobs.lock().await;
        let take = n.min(jobs.len());
        jobs.drain(..take).collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Ids of the queued jobs, head first.
    pub async fn snapshot(&self) -> Vec<JobId> {
        self.jobs.lock().await.iter().map(Job::id).collect()
    }
}
