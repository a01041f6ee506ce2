use crate::circuit::CircuitState;
use std::time::{Duration, Instant};
use tower_outbound_core::events::OutboundEvent;

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    StateTransition {
        component_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    CallPermitted {
        component_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// The call was refused without reaching the inner service.
    CallRejected {
        component_name: String,
        timestamp: Instant,
    },
    SuccessRecorded {
        component_name: String,
        timestamp: Instant,
        state: CircuitState,
        duration: Duration,
    },
    FailureRecorded {
        component_name: String,
        timestamp: Instant,
        state: CircuitState,
        duration: Duration,
    },
}

impl OutboundEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { component_name, .. }
            | CircuitBreakerEvent::CallPermitted { component_name, .. }
            | CircuitBreakerEvent::CallRejected { component_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { component_name, .. }
            | CircuitBreakerEvent::FailureRecorded { component_name, .. } => component_name,
        }
    }
}
