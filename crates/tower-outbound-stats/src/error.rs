use thiserror::Error;
use tower_outbound_core::BoxError;

/// Errors raised by the stats crate.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A statistic was requested over no samples.
    #[error("statistic requested over an empty sequence")]
    EmptySequence,

    #[error("percentile {percentile} is outside [0, 1]")]
    InvalidPercentile { percentile: f64 },

    #[error("interval of {interval_secs}s for `{metric}` is outside [{min_secs}, {max_secs}] seconds")]
    InvalidInterval {
        metric: String,
        interval_secs: u64,
        min_secs: u64,
        max_secs: u64,
    },

    /// The emitter refused an aggregate.
    #[error("failed to emit `{metric}`")]
    Emit {
        metric: String,
        #[source]
        source: BoxError,
    },

    /// The aggregation itself panicked; the ticker keeps running.
    #[error("aggregation of `{metric}` panicked")]
    Panicked { metric: String },

    #[error("no Tokio runtime is available to run the ticker")]
    NoRuntime,

    #[error("aggregator for `{metric}` has been shut down")]
    ShutDown { metric: String },
}

impl StatsError {
    pub(crate) fn emit(metric: &str, source: BoxError) -> Self {
        StatsError::Emit {
            metric: metric.to_owned(),
            source,
        }
    }
}
