//! Config and MicroBatchBuilder - エンジンの構築と起動時検証
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: run の途中で panic させない
//! - 必須項目の欠落はフィールド名つきのエラーで返す

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::BuildError;
use crate::ports::Processor;
use crate::queue::{Backoff, RetryPolicy};

use super::engine::MicroBatch;

/// Required engine settings. Immutable once the engine is built.
#[derive(Clone)]
pub struct Config {
    /// Upper bound on jobs drained per tick.
    pub batch_size: usize,

    /// Time between ticks.
    pub frequency: Duration,

    pub processor: Arc<dyn Processor>,
}

impl Config {
    pub fn new(batch_size: usize, frequency: Duration, processor: impl Processor + 'static) -> Self {
        Self {
            batch_size,
            frequency,
            processor: Arc::new(processor),
        }
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.batch_size == 0 {
            return Err(BuildError::InvalidBatchSize);
        }
        // tick の deadline は Instant + frequency なので、加算できない値も拒否する
        if self.frequency.is_zero() || Instant::now().checked_add(self.frequency).is_none() {
            return Err(BuildError::InvalidFrequency);
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("batch_size", &self.batch_size)
            .field("frequency", &self.frequency)
            .finish_non_exhaustive()
    }
}

/// Builds a [`MicroBatch`].
///
/// # Example
/// ```ignore
/// let engine = MicroBatch::builder()
///     .batch_size(5)
///     .frequency(Duration::from_secs(2))
///     .processor(SquareProcessor)
///     .max_retry_attempts(5)
///     .build()?;
/// ```
///
/// `build()` checks every required field and rejects zero values, so a
/// misconfigured engine never starts.
#[derive(Default)]
pub struct MicroBatchBuilder {
    batch_size: Option<usize>,
    frequency: Option<Duration>,
    processor: Option<Arc<dyn Processor>>,
    retry_policy: RetryPolicy,
}

impl MicroBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn frequency(mut self, frequency: Duration) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn processor(self, processor: impl Processor + 'static) -> Self {
        self.shared_processor(Arc::new(processor))
    }

    /// Use a processor the caller keeps a handle to (e.g. a test double).
    pub fn shared_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn max_retry_attempts(mut self, max_attempts: u32) -> Self {
        self.retry_policy.max_attempts = max_attempts;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.retry_policy.backoff = backoff;
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn build(self) -> Result<MicroBatch, BuildError> {
        let config = Config {
            batch_size: self.batch_size.ok_or(BuildError::Missing("batch_size"))?,
            frequency: self.frequency.ok_or(BuildError::Missing("frequency"))?,
            processor: self.processor.ok_or(BuildError::Missing("processor"))?,
        };
        MicroBatch::with_retry_policy(config, self.retry_policy)
    }
}
