//! Sinks for interval aggregates.
//!
//! Emitters are called synchronously from the ticker at interval
//! boundaries. A failing emitter is reported through the aggregator's
//! error callback; it never stops the ticker.
//!
//! Every trait is implemented for matching closures, so a test or a small
//! integration can pass `|name: &str, value: f64| { ...; Ok(()) }`.

use tower_outbound_core::BoxError;

/// One histogram interval: sample count, sum, mean and the fixed
/// percentile set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramRecord {
    pub n: usize,
    pub sum: f64,
    pub avg: f64,
    pub p0: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
    pub p9999: f64,
    pub p100: f64,
}

/// Receives the per-interval sum of added values.
pub trait CountEmitter: Send + Sync {
    fn emit_count(&self, metric: &str, count: f64) -> Result<(), BoxError>;
}

/// Receives the last value added during an interval.
pub trait GaugeEmitter: Send + Sync {
    fn emit_gauge(&self, metric: &str, last: f64) -> Result<(), BoxError>;
}

/// Receives the mean of the values added during an interval.
pub trait RateEmitter: Send + Sync {
    fn emit_rate(&self, metric: &str, rate: f64) -> Result<(), BoxError>;
}

pub trait HistogramEmitter: Send + Sync {
    fn emit_histogram(&self, metric: &str, record: &HistogramRecord) -> Result<(), BoxError>;
}

impl<F> CountEmitter for F
where
    F: Fn(&str, f64) -> Result<(), BoxError> + Send + Sync,
{
    fn emit_count(&self, metric: &str, count: f64) -> Result<(), BoxError> {
        self(metric, count)
    }
}

impl<F> GaugeEmitter for F
where
    F: Fn(&str, f64) -> Result<(), BoxError> + Send + Sync,
{
    fn emit_gauge(&self, metric: &str, last: f64) -> Result<(), BoxError> {
        self(metric, last)
    }
}

impl<F> RateEmitter for F
where
    F: Fn(&str, f64) -> Result<(), BoxError> + Send + Sync,
{
    fn emit_rate(&self, metric: &str, rate: f64) -> Result<(), BoxError> {
        self(metric, rate)
    }
}

impl<F> HistogramEmitter for F
where
    F: Fn(&str, &HistogramRecord) -> Result<(), BoxError> + Send + Sync,
{
    fn emit_histogram(&self, metric: &str, record: &HistogramRecord) -> Result<(), BoxError> {
        self(metric, record)
    }
}

#[cfg(feature = "metrics")]
pub use metrics_emitter::MetricsEmitter;

#[cfg(feature = "metrics")]
mod metrics_emitter {
    use super::*;
    use metrics::{counter, gauge};

    /// Forwards aggregates to the `metrics` facade.
    ///
    /// | aggregate | recorded as |
    /// |---|---|
    /// | count | counter `<metric>`, incremented by the rounded count |
    /// | gauge | gauge `<metric>` |
    /// | rate | gauge `<metric>` |
    /// | histogram | gauges `<metric>` labelled `quantile`, plus `<metric>_count` and `<metric>_sum` |
    #[derive(Debug, Clone, Copy, Default)]
    pub struct MetricsEmitter;

    impl CountEmitter for MetricsEmitter {
        fn emit_count(&self, metric: &str, count: f64) -> Result<(), BoxError> {
            if !count.is_finite() {
                return Err(format!("non-finite count {count}").into());
            }
            counter!(metric.to_owned()).increment(count.max(0.0).round() as u64);
            Ok(())
        }
    }

    impl GaugeEmitter for MetricsEmitter {
        fn emit_gauge(&self, metric: &str, last: f64) -> Result<(), BoxError> {
            gauge!(metric.to_owned()).set(last);
            Ok(())
        }
    }

    impl RateEmitter for MetricsEmitter {
        fn emit_rate(&self, metric: &str, rate: f64) -> Result<(), BoxError> {
            gauge!(metric.to_owned()).set(rate);
            Ok(())
        }
    }

    impl HistogramEmitter for MetricsEmitter {
        fn emit_histogram(&self, metric: &str, record: &HistogramRecord) -> Result<(), BoxError> {
            let quantiles = [
                ("0", record.p0),
                ("0.5", record.p50),
                ("0.9", record.p90),
                ("0.95", record.p95),
                ("0.99", record.p99),
                ("0.999", record.p999),
                ("0.9999", record.p9999),
                ("1", record.p100),
            ];
            for (quantile, value) in quantiles {
                gauge!(metric.to_owned(), "quantile" => quantile).set(value);
            }
            gauge!(format!("{metric}_count")).set(record.n as f64);
            gauge!(format!("{metric}_sum")).set(record.sum);
            Ok(())
        }
    }
}
