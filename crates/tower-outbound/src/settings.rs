//! Plain-data configuration for a whole [`Pipeline`](crate::Pipeline).

use std::time::Duration;
use thiserror::Error;
use tower_outbound_circuitbreaker::CircuitBreakerConfigBuilder;
use tower_outbound_retry::{
    RetryBudget, RetryConfigBuilder, DEFAULT_MAX_DELAY, DEFAULT_RETRY_COUNT, DEFAULT_SEED_DELAY,
};
use tower_outbound_timeout::{AttemptTimeoutConfigBuilder, DEFAULT_ATTEMPT_TIMEOUT};

/// A setting outside its documented range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{field}` must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("`{field}` must be greater than zero")]
    Zero { field: &'static str },

    #[error("`max_delay` ({max_delay:?}) is shorter than `seed_delay` ({seed_delay:?})")]
    MaxDelayBelowSeed {
        seed_delay: Duration,
        max_delay: Duration,
    },
}

impl ConfigError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::OutOfRange { field, .. } | ConfigError::Zero { field } => field,
            ConfigError::MaxDelayBelowSeed { .. } => "max_delay",
        }
    }
}

/// Settings for one dependency's pipeline.
///
/// With the `serde` feature, durations are (de)serialized as whole
/// milliseconds under a `_ms` suffix and missing fields take their
/// defaults:
///
/// ```json
/// {
///   "name": "inventory",
///   "retry_count": 2,
///   "seed_delay_ms": 50,
///   "retry_budget_threshold": 0.1,
///   "attempt_timeout_ms": 800
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineSettings {
    /// Names every component, for events, logs and metrics.
    pub name: String,
    pub retry_count: usize,
    #[cfg_attr(feature = "serde", serde(rename = "seed_delay_ms", with = "millis"))]
    pub seed_delay: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "max_delay_ms", with = "millis"))]
    pub max_delay: Duration,
    /// `None` disables the retry budget.
    pub retry_budget_threshold: Option<f64>,
    pub failure_threshold: f64,
    #[cfg_attr(feature = "serde", serde(rename = "sampling_duration_ms", with = "millis"))]
    pub sampling_duration: Duration,
    pub minimum_throughput: usize,
    #[cfg_attr(feature = "serde", serde(rename = "duration_of_break_ms", with = "millis"))]
    pub duration_of_break: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "attempt_timeout_ms", with = "millis"))]
    pub attempt_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            name: String::from("outbound"),
            retry_count: DEFAULT_RETRY_COUNT,
            seed_delay: DEFAULT_SEED_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            retry_budget_threshold: None,
            failure_threshold: 0.5,
            sampling_duration: Duration::from_secs(10),
            minimum_throughput: 10,
            duration_of_break: Duration::from_secs(30),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

fn non_zero(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        Err(ConfigError::Zero { field })
    } else {
        Ok(())
    }
}

impl PipelineSettings {
    /// Checks every field, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero("seed_delay", self.seed_delay)?;
        if self.max_delay < self.seed_delay {
            return Err(ConfigError::MaxDelayBelowSeed {
                seed_delay: self.seed_delay,
                max_delay: self.max_delay,
            });
        }
        if let Some(threshold) = self.retry_budget_threshold {
            unit_interval("retry_budget_threshold", threshold)?;
        }
        unit_interval("failure_threshold", self.failure_threshold)?;
        non_zero("sampling_duration", self.sampling_duration)?;
        non_zero("duration_of_break", self.duration_of_break)?;
        non_zero("attempt_timeout", self.attempt_timeout)?;
        Ok(())
    }

    /// Retry builder preloaded with these settings. Listeners can still be
    /// added before building.
    pub fn retry_builder(&self) -> RetryConfigBuilder {
        let builder = RetryConfigBuilder::new()
            .name(self.name.clone())
            .retry_count(self.retry_count)
            .seed_delay(self.seed_delay)
            .max_delay(self.max_delay);
        match self.retry_budget_threshold {
            Some(threshold) => builder.budget(std::sync::Arc::new(
                RetryBudget::new(threshold).named(self.name.clone()),
            )),
            None => builder,
        }
    }

    pub fn circuit_breaker_builder(&self) -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
            .name(self.name.clone())
            .failure_threshold(self.failure_threshold)
            .sampling_duration(self.sampling_duration)
            .minimum_throughput(self.minimum_throughput)
            .duration_of_break(self.duration_of_break)
    }

    pub fn attempt_timeout_builder(&self) -> AttemptTimeoutConfigBuilder {
        AttemptTimeoutConfigBuilder::new()
            .name(self.name.clone())
            .timeout(self.attempt_timeout)
    }
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
