use crate::error::StatsError;
use std::time::Duration;

/// Longest interval for count, gauge and rate aggregators: one day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Longest interval for histogram aggregators: one minute.
pub const MAX_HISTOGRAM_INTERVAL_SECS: u64 = 60;

/// Name and interval of one aggregated metric.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSettings {
    pub metric_name: String,
    pub interval_secs: u64,
}

impl StatsSettings {
    pub fn new(metric_name: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            metric_name: metric_name.into(),
            interval_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Checks the interval against `[1, max_secs]`.
    pub fn validate(&self, max_secs: u64) -> Result<(), StatsError> {
        if (1..=max_secs).contains(&self.interval_secs) {
            Ok(())
        } else {
            Err(StatsError::InvalidInterval {
                metric: self.metric_name.clone(),
                interval_secs: self.interval_secs,
                min_secs: 1,
                max_secs,
            })
        }
    }
}
