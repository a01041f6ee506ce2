//! Sliding-window circuit breaker for outbound HTTP calls.
//!
//! The breaker samples every call made while it is closed. When, within
//! the trailing `sampling_duration`, at least `minimum_throughput` calls
//! have been seen and the share of failures reaches `failure_threshold`,
//! the circuit opens and calls fail fast with
//! [`OutboundError::CircuitOpen`] without reaching the dependency.
//!
//! After `duration_of_break` a single trial call is let through. Its
//! outcome closes the circuit (with a fresh window) or opens it again for
//! another break. A trial that is dropped before finishing frees the slot
//! for the next caller.
//!
//! What counts as a failure is decided by a [`FailureClassifier`]. The
//! default, [`HttpFailureClassifier`], counts errors, 5xx and 429.
//!
//! ```rust
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use std::time::Duration;
//! use tower::{Layer, Service, ServiceExt, service_fn};
//! use tower_outbound_circuitbreaker::{CircuitBreakerLayer, CircuitState};
//! use tower_outbound_core::{OutboundError, OutboundRequest};
//!
//! # async fn example() -> Result<(), OutboundError> {
//! let layer = CircuitBreakerLayer::builder()
//!     .failure_threshold(0.5)
//!     .minimum_throughput(10)
//!     .duration_of_break(Duration::from_secs(30))
//!     .on_state_transition(|from, to| println!("breaker {from:?} -> {to:?}"))
//!     .build();
//!
//! let transport = service_fn(|_req: OutboundRequest| async {
//!     Ok::<_, OutboundError>(Response::new(Bytes::new()))
//! });
//! let mut client = layer.layer(transport);
//!
//! let request = OutboundRequest::new(Request::get("http://ledger/entries").body(Bytes::new()).unwrap());
//! client.ready().await?.call(request).await?;
//! assert_eq!(client.state(), CircuitState::Closed);
//! # Ok(())
//! # }
//! ```

mod circuit;
mod classifier;
mod config;
mod events;
mod layer;

pub use circuit::{CircuitMetrics, CircuitState};
pub use classifier::{FailureClassifier, FnClassifier, HttpFailureClassifier, Outcome};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

use circuit::{Circuit, Permit};
use futures::future::BoxFuture;
use http::Response;
#[cfg(feature = "metrics")]
use metrics::counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::Service;
use tower_outbound_core::{OutboundError, OutboundRequest};
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// A Tower [`Service`] that guards its inner service with a circuit.
pub struct CircuitBreaker<S> {
    inner: S,
    config: Arc<CircuitBreakerConfig>,
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
}

impl<S> CircuitBreaker<S> {
    pub(crate) fn new(
        inner: S,
        config: Arc<CircuitBreakerConfig>,
        circuit: Arc<Mutex<Circuit>>,
        state_atomic: Arc<AtomicU8>,
    ) -> Self {
        Self {
            inner,
            config,
            circuit,
            state_atomic,
        }
    }

    /// Current state, read without taking the circuit lock.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Snapshot of the sampling window.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().metrics(&self.config)
    }

    pub fn force_open(&self) {
        self.circuit.lock().force_open(&self.config);
    }

    pub fn force_closed(&self) {
        self.circuit.lock().force_closed(&self.config);
    }

    /// Closes the circuit and discards the window without emitting events.
    pub fn reset(&self) {
        self.circuit.lock().reset();
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

impl<S> Clone for CircuitBreaker<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
        }
    }
}

/// Frees the half-open trial slot if the call future is dropped before the
/// outcome is recorded.
struct TrialGuard {
    circuit: Option<Arc<Mutex<Circuit>>>,
}

impl TrialGuard {
    fn new(circuit: &Arc<Mutex<Circuit>>, permit: Permit) -> Self {
        let circuit = (permit == Permit::Trial).then(|| Arc::clone(circuit));
        Self { circuit }
    }

    fn disarm(&mut self) {
        self.circuit = None;
    }
}

impl Drop for TrialGuard {
    fn drop(&mut self) {
        if let Some(circuit) = self.circuit.take() {
            circuit.lock().release_trial();
        }
    }
}

impl<S, B, RB> Service<OutboundRequest<B>> for CircuitBreaker<S>
where
    S: Service<OutboundRequest<B>, Response = Response<RB>, Error = OutboundError>,
    S::Future: Send + 'static,
    RB: Send + 'static,
{
    type Response = Response<RB>;
    type Error = OutboundError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: OutboundRequest<B>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let (permit, state) = {
            let mut circuit = self.circuit.lock();
            let permit = circuit.try_acquire(&config);
            (permit, circuit.state())
        };

        let Some(permit) = permit else {
            config.event_listeners.emit(&CircuitBreakerEvent::CallRejected {
                component_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
            });

            #[cfg(feature = "tracing")]
            debug!(circuitbreaker = %config.name, "circuit open, rejecting call");

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);

            let name = config.name.clone();
            return Box::pin(async move {
                Err::<Response<RB>, _>(OutboundError::CircuitOpen { name })
            });
        };

        config.event_listeners.emit(&CircuitBreakerEvent::CallPermitted {
            component_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state,
        });

        #[cfg(feature = "tracing")]
        trace!(circuitbreaker = %config.name, state = state.as_str(), "circuit breaker permitted call");

        let circuit = Arc::clone(&self.circuit);
        let mut guard = TrialGuard::new(&circuit, permit);
        let start = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let outcome = fut.await;
            let is_failure = config.classifier.is_failure(Outcome::of(&outcome));
            guard.disarm();
            circuit
                .lock()
                .record(&config, permit, is_failure, start.elapsed());
            outcome
        })
    }
}
