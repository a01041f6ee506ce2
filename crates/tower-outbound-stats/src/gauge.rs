use crate::aggregator::{Aggregation, IntervalAggregator};
use crate::emitter::GaugeEmitter;
use crate::error::StatsError;
use crate::settings::{StatsSettings, MAX_INTERVAL_SECS};
use parking_lot::Mutex;

/// Keeps the last value added per interval. Emits nothing for an interval
/// without values.
pub struct GaugeStats<E> {
    last: Mutex<Option<f64>>,
    emitter: E,
}

pub type GaugeAggregator<E> = IntervalAggregator<GaugeStats<E>>;

impl<E: GaugeEmitter + 'static> IntervalAggregator<GaugeStats<E>> {
    pub fn gauge(settings: StatsSettings, emitter: E) -> Result<Self, StatsError> {
        IntervalAggregator::new(
            settings,
            MAX_INTERVAL_SECS,
            GaugeStats {
                last: Mutex::new(None),
                emitter,
            },
        )
    }
}

impl<E: GaugeEmitter + 'static> Aggregation for GaugeStats<E> {
    fn add(&self, value: f64) {
        *self.last.lock() = Some(value);
    }

    fn aggregate(&self, metric: &str) -> Result<(), StatsError> {
        let Some(last) = self.last.lock().take() else {
            return Ok(());
        };
        self.emitter
            .emit_gauge(metric, last)
            .map_err(|source| StatsError::emit(metric, source))
    }
}
