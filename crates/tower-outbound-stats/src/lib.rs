//! Interval-aligned statistics for outbound calls.
//!
//! An [`IntervalAggregator`] collects `f64` samples on the request path and,
//! on a background ticker aligned to interval boundaries, hands each
//! interval's aggregate to an emitter. Four aggregations are provided:
//!
//! | aggregator | emits per interval | interval range |
//! |---|---|---|
//! | [`CountAggregator`] | sum of added values, if any were added | 1s to 1 day |
//! | [`GaugeAggregator`] | last added value, if any was added | 1s to 1 day |
//! | [`RateAggregator`] | mean of added values (`0.0` when idle) | 1s to 1 day |
//! | [`HistogramAggregator`] | N, sum, mean, p0/p50/p90/p95/p99/p99.9/p99.99/p100 | 1s to 60s |
//!
//! The request path only ever takes a short lock to record a sample.
//! Aggregation, including the histogram's sort, runs on samples that have
//! already been swapped out of the shared buffer.
//!
//! [`MeasureLayer`] wires an aggregator into a Tower stack by recording the
//! elapsed milliseconds of every call.
//!
//! ```
//! use std::sync::Arc;
//! use tower_outbound_core::BoxError;
//! use tower_outbound_stats::{CountAggregator, StatsSettings};
//!
//! let requests = CountAggregator::count(
//!     StatsSettings::new("inventory.requests", 10),
//!     |metric: &str, count: f64| -> Result<(), BoxError> {
//!         println!("{metric} = {count}");
//!         Ok(())
//!     },
//! )
//! .unwrap();
//!
//! requests.add(1.0);
//! requests.add(1.0);
//! requests.flush().unwrap();
//! ```
//!
//! ## Feature flags
//!
//! - `metrics`: [`MetricsEmitter`] forwards aggregates to the `metrics`
//!   facade, and aggregation failures are counted.
//! - `tracing`: ticker lifecycle and aggregation failures are logged.
//! - `serde`: [`StatsSettings`] can be deserialized.

mod aggregator;
pub mod calculator;
mod count;
mod emitter;
mod error;
mod gauge;
mod histogram;
mod layer;
mod rate;
mod schedule;
mod settings;

pub use aggregator::{Aggregation, IntervalAggregator};
pub use count::{CountAggregator, CountStats};
#[cfg(feature = "metrics")]
pub use emitter::MetricsEmitter;
pub use emitter::{CountEmitter, GaugeEmitter, HistogramEmitter, HistogramRecord, RateEmitter};
pub use error::StatsError;
pub use gauge::{GaugeAggregator, GaugeStats};
pub use histogram::{next_capacity, HistogramAggregator, HistogramStats, INITIAL_CAPACITY};
pub use layer::{Measure, MeasureLayer, Sample};
pub use rate::{RateAggregator, RateStats};
pub use schedule::{next_interval_delay, since_midnight_utc, TICK_PAD};
pub use settings::{StatsSettings, MAX_HISTOGRAM_INTERVAL_SECS, MAX_INTERVAL_SECS};
