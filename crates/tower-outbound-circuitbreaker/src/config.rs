use crate::circuit::CircuitState;
use crate::classifier::{FailureClassifier, FnClassifier, HttpFailureClassifier, Outcome};
use crate::events::CircuitBreakerEvent;
use crate::layer::CircuitBreakerLayer;
use std::sync::Arc;
use std::time::Duration;
use tower_outbound_core::events::{EventListeners, FnListener};

/// Configuration for one circuit breaker.
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: f64,
    pub(crate) sampling_duration: Duration,
    pub(crate) minimum_throughput: usize,
    pub(crate) duration_of_break: Duration,
    pub(crate) classifier: Arc<dyn FailureClassifier>,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_threshold(&self) -> f64 {
        self.failure_threshold
    }

    pub fn sampling_duration(&self) -> Duration {
        self.sampling_duration
    }

    pub fn minimum_throughput(&self) -> usize {
        self.minimum_throughput
    }

    pub fn duration_of_break(&self) -> Duration {
        self.duration_of_break
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: f64,
    sampling_duration: Duration,
    minimum_throughput: usize,
    duration_of_break: Duration,
    classifier: Arc<dyn FailureClassifier>,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Creates a builder with default values.
    ///
    /// Defaults:
    /// - failure_threshold: 0.5
    /// - sampling_duration: 10s
    /// - minimum_throughput: 10
    /// - duration_of_break: 30s
    /// - classifier: [`HttpFailureClassifier`]
    pub fn new() -> Self {
        Self {
            failure_threshold: 0.5,
            sampling_duration: Duration::from_secs(10),
            minimum_throughput: 10,
            duration_of_break: Duration::from_secs(30),
            classifier: Arc::new(HttpFailureClassifier),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Failure rate in `[0, 1]` at or above which the circuit opens.
    ///
    /// Values outside the range are clamped.
    pub fn failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = if threshold.is_nan() {
            1.0
        } else {
            threshold.clamp(0.0, 1.0)
        };
        self
    }

    /// Trailing window over which failure rate and throughput are measured.
    pub fn sampling_duration(mut self, duration: Duration) -> Self {
        self.sampling_duration = duration;
        self
    }

    /// Calls that must be seen within the window before it may open.
    pub fn minimum_throughput(mut self, calls: usize) -> Self {
        self.minimum_throughput = calls;
        self
    }

    /// How long the circuit stays open before admitting a trial call.
    pub fn duration_of_break(mut self, duration: Duration) -> Self {
        self.duration_of_break = duration;
        self
    }

    /// Replaces the failure classifier.
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: FailureClassifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Classifies with a closure. Shorthand for `classifier(FnClassifier::new(f))`.
    pub fn classify_with<F>(self, f: F) -> Self
    where
        F: Fn(Outcome<'_>) -> bool + Send + Sync + 'static,
    {
        self.classifier(FnClassifier::new(f))
    }

    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for state transitions.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback for calls rejected while open.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    pub fn build_config(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            sampling_duration: self.sampling_duration,
            minimum_throughput: self.minimum_throughput,
            duration_of_break: self.duration_of_break,
            classifier: self.classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the layer. Every service it produces shares one breaker.
    pub fn build(self) -> CircuitBreakerLayer {
        CircuitBreakerLayer::new(self.build_config())
    }
}
