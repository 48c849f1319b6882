//! Domain model (ids, jobs, results).
//!
//! Nothing here knows about queues, ticks or retries; it only fixes the
//! "shape" of the data that flows through the engine.

pub mod ids;
pub mod job;

pub use ids::{BatchId, JobId};
pub use job::{Job, JobResult};
