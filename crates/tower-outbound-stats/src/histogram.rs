//! Percentile histograms over an interval's samples.
//!
//! Samples accumulate in a buffer. On each tick the buffer is swapped for
//! a fresh one under the lock, and sorting and percentile math run on the
//! swapped-out samples with the lock released.

use crate::aggregator::{Aggregation, IntervalAggregator};
use crate::calculator::{average, percentile, sum};
use crate::emitter::{HistogramEmitter, HistogramRecord};
use crate::error::StatsError;
use crate::settings::{StatsSettings, MAX_HISTOGRAM_INTERVAL_SECS};
use parking_lot::Mutex;

/// Capacity of a fresh buffer, and the floor for shrinking.
pub const INITIAL_CAPACITY: usize = 1_024;

/// Capacity for the next interval's buffer, given how many samples the
/// last one held and its capacity.
///
/// Quiet intervals get [`INITIAL_CAPACITY`]. After a burst the capacity is
/// halved while half of it would still cover `count`, so memory follows
/// the load back down instead of staying at the peak.
pub fn next_capacity(count: usize, capacity: usize) -> usize {
    if count <= INITIAL_CAPACITY {
        return INITIAL_CAPACITY;
    }
    let mut trimmed = capacity.max(count);
    while trimmed / 2 > count {
        trimmed /= 2;
    }
    trimmed
}

impl HistogramRecord {
    /// Summarises an ascending, non-empty sequence.
    pub fn from_sorted(sequence: &[f64]) -> Result<Self, StatsError> {
        Ok(HistogramRecord {
            n: sequence.len(),
            sum: sum(sequence)?,
            avg: average(sequence)?,
            p0: percentile(sequence, 0.0)?,
            p50: percentile(sequence, 0.50)?,
            p90: percentile(sequence, 0.90)?,
            p95: percentile(sequence, 0.95)?,
            p99: percentile(sequence, 0.99)?,
            p999: percentile(sequence, 0.999)?,
            p9999: percentile(sequence, 0.9999)?,
            p100: percentile(sequence, 1.0)?,
        })
    }
}

/// Emits N, sum, mean and percentiles of each interval's samples.
///
/// Intervals without samples emit nothing.
pub struct HistogramStats<E> {
    buffer: Mutex<Vec<f64>>,
    emitter: E,
}

pub type HistogramAggregator<E> = IntervalAggregator<HistogramStats<E>>;

impl<E: HistogramEmitter + 'static> IntervalAggregator<HistogramStats<E>> {
    /// Interval range is `[1, 60]` seconds.
    pub fn histogram(settings: StatsSettings, emitter: E) -> Result<Self, StatsError> {
        IntervalAggregator::new(
            settings,
            MAX_HISTOGRAM_INTERVAL_SECS,
            HistogramStats {
                buffer: Mutex::new(Vec::with_capacity(INITIAL_CAPACITY)),
                emitter,
            },
        )
    }
}

impl<E> HistogramStats<E> {
    /// Takes the current interval's samples, leaving a right-sized empty
    /// buffer in their place.
    pub(crate) fn take_buffer(&self) -> Vec<f64> {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return Vec::new();
        }
        let capacity = next_capacity(buffer.len(), buffer.capacity());
        std::mem::replace(&mut *buffer, Vec::with_capacity(capacity))
    }

    /// Number of samples waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Capacity of the current buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity()
    }
}

impl<E: HistogramEmitter + 'static> Aggregation for HistogramStats<E> {
    fn add(&self, value: f64) {
        self.buffer.lock().push(value);
    }

    fn aggregate(&self, metric: &str) -> Result<(), StatsError> {
        let mut sequence = self.take_buffer();
        if sequence.is_empty() {
            return Ok(());
        }
        sequence.sort_unstable_by(f64::total_cmp);
        let record = HistogramRecord::from_sorted(&sequence)?;
        self.emitter
            .emit_histogram(metric, &record)
            .map_err(|source| StatsError::emit(metric, source))
    }
}
