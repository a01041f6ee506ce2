use crate::circuit::{Circuit, CircuitMetrics, CircuitState};
use crate::config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use crate::CircuitBreaker;
use parking_lot::Mutex;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that guards a dependency with a circuit breaker.
///
/// The circuit lives in the layer, so every service produced by
/// [`Layer::layer`] (and every clone of those services) observes and
/// feeds the same state.
///
/// ```rust
/// use std::time::Duration;
/// use tower_outbound_circuitbreaker::CircuitBreakerLayer;
///
/// let layer = CircuitBreakerLayer::builder()
///     .failure_threshold(0.5)
///     .minimum_throughput(20)
///     .sampling_duration(Duration::from_secs(30))
///     .duration_of_break(Duration::from_secs(15))
///     .name("payments")
///     .build();
/// ```
#[derive(Clone)]
pub struct CircuitBreakerLayer {
    config: Arc<CircuitBreakerConfig>,
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
}

impl CircuitBreakerLayer {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            config: Arc::new(config),
            circuit: Arc::new(Mutex::new(Circuit::new(Arc::clone(&state_atomic)))),
            state_atomic,
        }
    }

    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state of the shared circuit.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(std::sync::atomic::Ordering::Acquire))
    }

    /// Snapshot of the shared sampling window.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().metrics(&self.config)
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreaker<S>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(
            service,
            Arc::clone(&self.config),
            Arc::clone(&self.circuit),
            Arc::clone(&self.state_atomic),
        )
    }
}
