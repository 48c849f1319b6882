//! App - the engine itself.
//!
//! # Components
//! - **MicroBatch**: facade; submit / run / shutdown / completion
//! - **MicroBatchBuilder**: construction with fail-fast validation
//! - **BatchScheduler**: tick -> drain -> dispatch loop
//! - **process_with_retry**: per-job retry executor
//! - **ShutdownSignal**: single-fire completion broadcast

pub mod builder;
pub mod engine;
pub mod executor;
pub mod scheduler;
pub mod shutdown;

pub use self::builder::{Config, MicroBatchBuilder};
pub use self::engine::MicroBatch;
pub use self::executor::process_with_retry;
pub use self::scheduler::SchedulerState;
pub use self::shutdown::{Completion, ShutdownSignal};
