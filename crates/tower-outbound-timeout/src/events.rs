use std::time::{Duration, Instant};
use tower_outbound_core::events::OutboundEvent;

/// Events emitted by the attempt timeout.
#[derive(Debug, Clone)]
pub enum TimeoutEvent {
    /// The attempt produced a response before the deadline.
    Success {
        component_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The attempt failed before the deadline.
    Error {
        component_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The deadline fired first.
    Timeout {
        component_name: String,
        timestamp: Instant,
        timeout: Duration,
    },
    /// The caller cancelled first.
    Cancelled {
        component_name: String,
        timestamp: Instant,
        duration: Duration,
    },
}

impl OutboundEvent for TimeoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeoutEvent::Success { .. } => "success",
            TimeoutEvent::Error { .. } => "error",
            TimeoutEvent::Timeout { .. } => "timeout",
            TimeoutEvent::Cancelled { .. } => "cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeoutEvent::Success { timestamp, .. }
            | TimeoutEvent::Error { timestamp, .. }
            | TimeoutEvent::Timeout { timestamp, .. }
            | TimeoutEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            TimeoutEvent::Success { component_name, .. }
            | TimeoutEvent::Error { component_name, .. }
            | TimeoutEvent::Timeout { component_name, .. }
            | TimeoutEvent::Cancelled { component_name, .. } => component_name,
        }
    }
}
