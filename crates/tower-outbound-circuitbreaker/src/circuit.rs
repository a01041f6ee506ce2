use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Phase of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow and are sampled.
    Closed = 0,
    /// Calls are rejected until the break duration has elapsed.
    Open = 1,
    /// One trial call is admitted; its outcome closes or re-opens the circuit.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of the sampling window.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    /// Calls recorded within the sampling duration.
    pub total_calls: usize,
    pub failure_count: usize,
    pub success_count: usize,
    /// `failure_count / total_calls`, `0.0` for an empty window.
    pub failure_rate: f64,
    pub time_since_state_change: Duration,
}

/// How a call was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Permit {
    /// Admitted while closed; its outcome is sampled.
    Sampled,
    /// The single half-open trial.
    Trial,
}

#[derive(Debug, Clone, Copy)]
struct CallRecord {
    at: Instant,
    is_failure: bool,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    records: VecDeque<CallRecord>,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            opened_at: None,
            trial_in_flight: false,
            records: VecDeque::new(),
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    /// Admits or rejects a call. Moves Open to HalfOpen once the break
    /// duration has elapsed.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> Option<Permit> {
        match self.state {
            CircuitState::Closed => Some(Permit::Sampled),
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= config.duration_of_break {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.trial_in_flight = true;
                    Some(Permit::Trial)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    None
                } else {
                    self.trial_in_flight = true;
                    Some(Permit::Trial)
                }
            }
        }
    }

    /// Records the outcome of an admitted call.
    pub(crate) fn record(
        &mut self,
        config: &CircuitBreakerConfig,
        permit: Permit,
        is_failure: bool,
        duration: Duration,
    ) {
        let event = if is_failure {
            CircuitBreakerEvent::FailureRecorded {
                component_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
                duration,
            }
        } else {
            CircuitBreakerEvent::SuccessRecorded {
                component_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
                duration,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            let outcome = if is_failure { "failure" } else { "success" };
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => outcome).increment(1);
            histogram!("circuitbreaker_call_duration_seconds", "circuitbreaker" => config.name.clone())
                .record(duration.as_secs_f64());
        }

        match (permit, self.state) {
            (Permit::Trial, CircuitState::HalfOpen) => {
                self.trial_in_flight = false;
                if is_failure {
                    self.transition_to(CircuitState::Open, config);
                } else {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            (Permit::Sampled, CircuitState::Closed) => {
                let now = Instant::now();
                self.prune(now, config.sampling_duration);
                self.records.push_back(CallRecord { at: now, is_failure });
                self.evaluate_window(config);
            }
            // Late results from calls admitted before the last transition
            // belong to a window that no longer exists.
            _ => {
                #[cfg(feature = "tracing")]
                debug!(
                    circuitbreaker = %config.name,
                    state = self.state.as_str(),
                    "ignoring outcome admitted under a previous state"
                );
            }
        }
    }

    /// Gives up an unfinished trial so the next call can take over.
    pub(crate) fn release_trial(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.trial_in_flight = false;
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(record) = self.records.front() {
            if now.duration_since(record.at) >= window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    fn window_stats(&self) -> (usize, usize) {
        let failures = self.records.iter().filter(|r| r.is_failure).count();
        (self.records.len(), failures)
    }

    fn evaluate_window(&mut self, config: &CircuitBreakerConfig) {
        let (total, failures) = self.window_stats();
        if failures == 0 || total < config.minimum_throughput {
            return;
        }
        let failure_rate = failures as f64 / total as f64;
        if failure_rate >= config.failure_threshold {
            #[cfg(feature = "tracing")]
            info!(
                circuitbreaker = %config.name,
                failure_rate,
                total_calls = total,
                "failure rate over threshold"
            );
            self.transition_to(CircuitState::Open, config);
        }
    }

    pub(crate) fn metrics(&mut self, config: &CircuitBreakerConfig) -> CircuitMetrics {
        self.prune(Instant::now(), config.sampling_duration);
        let (total_calls, failure_count) = self.window_stats();
        let failure_rate = if total_calls > 0 {
            failure_count as f64 / total_calls as f64
        } else {
            0.0
        };
        CircuitMetrics {
            state: self.state,
            total_calls,
            failure_count,
            success_count: total_calls - failure_count,
            failure_rate,
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub(crate) fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.state_atomic
            .store(CircuitState::Closed as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.opened_at = None;
        self.trial_in_flight = false;
        self.records.clear();
    }

    fn transition_to(&mut self, to: CircuitState, config: &CircuitBreakerConfig) {
        let from = self.state;
        if from == to {
            return;
        }

        self.state = to;
        self.state_atomic.store(to as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.trial_in_flight = false;
        match to {
            CircuitState::Open => self.opened_at = Some(self.last_state_change),
            CircuitState::Closed => {
                self.opened_at = None;
                self.records.clear();
            }
            CircuitState::HalfOpen => {}
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                component_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state: from,
                to_state: to,
            });

        #[cfg(feature = "tracing")]
        info!(
            circuitbreaker = %config.name,
            from = from.as_str(),
            to = to.as_str(),
            "circuit breaker state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone()).set(to as u8 as f64);
        }
    }
}
