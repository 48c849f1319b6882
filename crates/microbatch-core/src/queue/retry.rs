//! Retry policy: how many times a job may be attempted, and how long to wait
//! between attempts.

use std::time::Duration;

use rand::Rng;

/// Attempts per job when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay between a retryable failure and the next attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately. The tick cadence is the only throttle.
    None,

    /// `base_delay * multiplier^(attempts - 1)`, capped at `max_delay`.
    ///
    /// With `jitter`, half of the delay is fixed and the other half is drawn
    /// uniformly, so callers hitting the same limit spread out.
    Exponential {
        base_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
        jitter: bool,
    },
}

/// Retry policy for failed jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Upper bound on processor calls for a single job.
    pub max_attempts: u32,

    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay before the next attempt.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    ///
    /// Example with base_delay=2s, multiplier=2.0, no jitter:
    /// - after attempt 1: 2s
    /// - after attempt 2: 4s
    /// - after attempt 3: 8s
    pub fn next_delay(&self, attempts: u32) -> Duration {
        match &self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Exponential {
                base_delay,
                multiplier,
                max_delay,
                jitter,
            } => {
                let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = base_delay.as_secs_f64() * multiplier.powi(exponent);
                let capped = if secs.is_finite() && secs < max_delay.as_secs_f64() {
                    Duration::from_secs_f64(secs.max(0.0))
                } else {
                    *max_delay
                };

                if *jitter {
                    let half = capped / 2;
                    let spread = rand::thread_rng().gen_range(0.0..=1.0);
                    half + half.mul_f64(spread)
                } else {
                    capped
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(jitter: bool) -> Backoff {
        Backoff::Exponential {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            jitter,
        }
    }

    #[test]
    fn default_policy_retries_immediately_three_times() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.backoff, Backoff::None);
        assert_eq!(policy.next_delay(1), Duration::ZERO);
        assert_eq!(policy.next_delay(50), Duration::ZERO);
    }

    #[test]
    fn exponential_backoff_increases_until_cap() {
        let policy = RetryPolicy::new(5).with_backoff(exponential(false));

        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
        assert_eq!(policy.next_delay(4), Duration::from_secs(10));
        assert_eq!(policy.next_delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn attempts_zero_uses_base_delay() {
        let policy = RetryPolicy::new(5).with_backoff(exponential(false));
        assert_eq!(policy.next_delay(0), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_within_half_and_full_delay() {
        let policy = RetryPolicy::new(5).with_backoff(exponential(true));

        for _ in 0..100 {
            let d = policy.next_delay(2);
            assert!(d >= Duration::from_secs(2), "{d:?} below half");
            assert!(d <= Duration::from_secs(4), "{d:?} above full");
        }
    }
}
