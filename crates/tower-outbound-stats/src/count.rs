use crate::aggregator::{Aggregation, IntervalAggregator};
use crate::emitter::CountEmitter;
use crate::error::StatsError;
use crate::settings::{StatsSettings, MAX_INTERVAL_SECS};
use parking_lot::Mutex;

/// Sums added values per interval.
///
/// Nothing is emitted for an interval in which nothing was added.
pub struct CountStats<E> {
    count: Mutex<Option<f64>>,
    emitter: E,
}

pub type CountAggregator<E> = IntervalAggregator<CountStats<E>>;

impl<E: CountEmitter + 'static> IntervalAggregator<CountStats<E>> {
    /// Interval range is `[1, 86400]` seconds.
    pub fn count(settings: StatsSettings, emitter: E) -> Result<Self, StatsError> {
        IntervalAggregator::new(
            settings,
            MAX_INTERVAL_SECS,
            CountStats {
                count: Mutex::new(None),
                emitter,
            },
        )
    }
}

impl<E: CountEmitter + 'static> Aggregation for CountStats<E> {
    fn add(&self, value: f64) {
        let mut count = self.count.lock();
        *count = Some(count.unwrap_or(0.0) + value);
    }

    fn aggregate(&self, metric: &str) -> Result<(), StatsError> {
        let Some(count) = self.count.lock().take() else {
            return Ok(());
        };
        self.emitter
            .emit_count(metric, count)
            .map_err(|source| StatsError::emit(metric, source))
    }
}
