use crate::policy::RetryReason;
use std::time::{Duration, Instant};
use tower_outbound_core::events::OutboundEvent;

/// Events emitted by the retry engine.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// Attempt `attempt` failed and retry `attempt + 1` follows after `delay`.
    Retry {
        component_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
        reason: RetryReason,
    },
    /// The call finished with an outcome that needed no retry.
    Success {
        component_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The call failed with a failure that is never retried.
    NotRetried {
        component_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Every retry was used and the last outcome was still retry-eligible.
    Exhausted {
        component_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The retry budget refused attempt `attempt`.
    BudgetExceeded {
        component_name: String,
        timestamp: Instant,
        attempt: usize,
        ratio: f64,
    },
}

impl OutboundEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::NotRetried { .. } => "not_retried",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::BudgetExceeded { .. } => "budget_exceeded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::NotRetried { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::BudgetExceeded { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            RetryEvent::Retry { component_name, .. }
            | RetryEvent::Success { component_name, .. }
            | RetryEvent::NotRetried { component_name, .. }
            | RetryEvent::Exhausted { component_name, .. }
            | RetryEvent::BudgetExceeded { component_name, .. } => component_name,
        }
    }
}
