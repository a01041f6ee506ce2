//! The retry, circuit breaker and attempt timeout stack in its only valid
//! order.

use crate::settings::{ConfigError, PipelineSettings};
use tower::Layer;
use tower_outbound_circuitbreaker::{CircuitBreaker, CircuitBreakerLayer, CircuitState};
use tower_outbound_retry::{Retry, RetryLayer};
use tower_outbound_timeout::{AttemptTimeout, AttemptTimeoutLayer};

/// The service a [`Pipeline`] wraps around a transport.
pub type PipelineService<S> = Retry<CircuitBreaker<AttemptTimeout<S>>>;

/// Retry outermost, then the circuit breaker, then the per-attempt timeout
/// next to the transport.
///
/// Every retry passes through the breaker, so an open circuit stops the
/// retry loop at once, and every attempt gets its own deadline. Services
/// produced by one pipeline share its breaker and retry budget.
///
/// Measurement sits outside and is stacked with a [`ServiceBuilder`]:
///
/// ```
/// use std::sync::Arc;
/// use tower::ServiceBuilder;
/// use tower_outbound::stats::{HistogramAggregator, HistogramRecord, MeasureLayer, StatsSettings};
/// use tower_outbound::{BoxError, OutboundError, OutboundRequest, Pipeline};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let latency = Arc::new(HistogramAggregator::histogram(
///     StatsSettings::new("ledger.latency_ms", 10),
///     |_: &str, _: &HistogramRecord| -> Result<(), BoxError> { Ok(()) },
/// )?);
///
/// let transport = tower::service_fn(|_req: OutboundRequest<String>| async {
///     Ok::<_, OutboundError>(http::Response::new(String::new()))
/// });
///
/// let _service = ServiceBuilder::new()
///     .layer(MeasureLayer::new(latency))
///     .layer(Pipeline::builder().build())
///     .service(transport);
/// # Ok(())
/// # }
/// ```
///
/// [`ServiceBuilder`]: tower::ServiceBuilder
#[derive(Clone)]
pub struct Pipeline {
    retry: RetryLayer,
    breaker: CircuitBreakerLayer,
    timeout: AttemptTimeoutLayer,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Validates `settings` and builds every component from them.
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            retry: settings.retry_builder().build(),
            breaker: settings.circuit_breaker_builder().build(),
            timeout: settings.attempt_timeout_builder().build(),
        })
    }

    pub fn retry(&self) -> &RetryLayer {
        &self.retry
    }

    pub fn breaker(&self) -> &CircuitBreakerLayer {
        &self.breaker
    }

    pub fn attempt_timeout(&self) -> &AttemptTimeoutLayer {
        &self.timeout
    }

    /// Current state of the shared circuit.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }
}

impl<S> Layer<S> for Pipeline {
    type Service = PipelineService<S>;

    fn layer(&self, transport: S) -> Self::Service {
        let timed = self.timeout.layer(transport);
        let guarded = self.breaker.layer(timed);
        self.retry.layer(guarded)
    }
}

/// Builder for [`Pipeline`]. Components left unset use their defaults.
#[derive(Default)]
pub struct PipelineBuilder {
    retry: Option<RetryLayer>,
    breaker: Option<CircuitBreakerLayer>,
    timeout: Option<AttemptTimeoutLayer>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry(mut self, layer: RetryLayer) -> Self {
        self.retry = Some(layer);
        self
    }

    pub fn circuit_breaker(mut self, layer: CircuitBreakerLayer) -> Self {
        self.breaker = Some(layer);
        self
    }

    pub fn attempt_timeout(mut self, layer: AttemptTimeoutLayer) -> Self {
        self.timeout = Some(layer);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            retry: self.retry.unwrap_or_else(|| RetryLayer::builder().build()),
            breaker: self
                .breaker
                .unwrap_or_else(|| CircuitBreakerLayer::builder().build()),
            timeout: self
                .timeout
                .unwrap_or_else(|| AttemptTimeoutLayer::builder().build()),
        }
    }
}
