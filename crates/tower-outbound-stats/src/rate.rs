use crate::aggregator::{Aggregation, IntervalAggregator};
use crate::emitter::RateEmitter;
use crate::error::StatsError;
use crate::settings::{StatsSettings, MAX_INTERVAL_SECS};
use parking_lot::Mutex;

#[derive(Default)]
struct Running {
    sum: f64,
    n: u64,
}

/// Averages added values per interval.
///
/// Unlike count and gauge, a rate is emitted every interval: an interval
/// without values reports `0.0`.
pub struct RateStats<E> {
    running: Mutex<Running>,
    emitter: E,
}

pub type RateAggregator<E> = IntervalAggregator<RateStats<E>>;

impl<E: RateEmitter + 'static> IntervalAggregator<RateStats<E>> {
    pub fn rate(settings: StatsSettings, emitter: E) -> Result<Self, StatsError> {
        IntervalAggregator::new(
            settings,
            MAX_INTERVAL_SECS,
            RateStats {
                running: Mutex::new(Running::default()),
                emitter,
            },
        )
    }
}

impl<E: RateEmitter + 'static> Aggregation for RateStats<E> {
    fn add(&self, value: f64) {
        let mut running = self.running.lock();
        running.sum += value;
        running.n += 1;
    }

    fn aggregate(&self, metric: &str) -> Result<(), StatsError> {
        let Running { sum, n } = std::mem::take(&mut *self.running.lock());
        let rate = if n == 0 { 0.0 } else { sum / n as f64 };
        self.emitter
            .emit_rate(metric, rate)
            .map_err(|source| StatsError::emit(metric, source))
    }
}
