//! Alignment of ticks to interval boundaries.
//!
//! Ticks land on multiples of the interval counted from midnight UTC, so a
//! 10 second aggregator fires at :00, :10, :20 and so on regardless of when
//! it was started. The delay is recomputed before every tick, which keeps
//! scheduling drift from accumulating.

use chrono::{Timelike, Utc};
use std::time::Duration;

/// Added to every delay so a tick lands just past its boundary, not just
/// before it.
pub const TICK_PAD: Duration = Duration::from_millis(10);

const MILLIS_PER_DAY: u64 = 86_400_000;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Delay from `since_midnight` until the next boundary of `interval`,
/// plus [`TICK_PAD`].
///
/// The unpadded part is in `(0, interval]`: standing exactly on a boundary
/// waits a full interval. `since_midnight` is reduced modulo one day and a
/// zero interval is treated as one millisecond.
pub fn next_interval_delay(since_midnight: Duration, interval: Duration) -> Duration {
    let interval_ms = millis(interval).max(1);
    let now_ms = millis(since_midnight) % MILLIS_PER_DAY;
    let current_bin = now_ms - now_ms % interval_ms;
    let next_boundary = current_bin + interval_ms;
    Duration::from_millis(next_boundary - now_ms) + TICK_PAD
}

/// Time elapsed since midnight UTC.
pub fn since_midnight_utc() -> Duration {
    let now = Utc::now().time();
    Duration::from_secs(u64::from(now.num_seconds_from_midnight()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000))
}

/// Delay until the next tick of `interval`, as seen from the wall clock.
pub(crate) fn delay_until_next_tick(interval: Duration) -> Duration {
    next_interval_delay(since_midnight_utc(), interval)
}
