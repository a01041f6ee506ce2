//! Backoff schedules.
//!
//! A schedule is produced once per logical call, before the first attempt,
//! and never changes afterwards. Its length always equals the configured
//! retry count, whether or not every retry ends up being used.

use rand::Rng;
use std::time::Duration;

/// Default cap applied to every generated delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Produces the delay schedule for one call.
pub trait Backoff: Send + Sync {
    /// Returns exactly `retry_count` delays; `delays[i]` is slept before
    /// retry `i + 1`.
    fn delays(&self, retry_count: usize) -> Vec<Duration>;
}

/// Decorrelated jitter.
///
/// Each delay is drawn uniformly from `[seed, 3 * previous]` and then
/// capped at `max_delay`. The first delay uses the seed as "previous".
/// Because every draw is anchored to the previous draw rather than to the
/// attempt number, schedules from many callers spread out instead of
/// lining up on the same instants.
#[derive(Debug, Clone)]
pub struct DecorrelatedJitter {
    seed: Duration,
    max_delay: Duration,
}

impl DecorrelatedJitter {
    pub fn new(seed: Duration) -> Self {
        Self {
            seed,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn seed(&self) -> Duration {
        self.seed
    }

    /// Generates a schedule from the supplied random source.
    pub fn delays_with<R: Rng + ?Sized>(&self, retry_count: usize, rng: &mut R) -> Vec<Duration> {
        let seed = as_nanos(self.seed);
        let cap = as_nanos(self.max_delay);

        let mut delays = Vec::with_capacity(retry_count);
        let mut previous = seed;
        for _ in 0..retry_count {
            let upper = previous.saturating_mul(3).max(seed);
            let drawn = if upper == seed {
                seed
            } else {
                rng.random_range(seed..=upper)
            };
            let delay = drawn.min(cap);
            delays.push(Duration::from_nanos(delay));
            previous = delay;
        }
        delays
    }
}

impl Backoff for DecorrelatedJitter {
    fn delays(&self, retry_count: usize) -> Vec<Duration> {
        self.delays_with(retry_count, &mut rand::rng())
    }
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backoff for FixedBackoff {
    fn delays(&self, retry_count: usize) -> Vec<Duration> {
        vec![self.delay; retry_count]
    }
}

fn as_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
