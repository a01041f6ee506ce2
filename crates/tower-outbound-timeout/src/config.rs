use crate::events::TimeoutEvent;
use crate::layer::AttemptTimeoutLayer;
use std::time::Duration;
use tower_outbound_core::events::{EventListeners, FnListener};

/// Default per-attempt deadline.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`AttemptTimeout`](crate::AttemptTimeout).
pub struct AttemptTimeoutConfig {
    pub(crate) timeout: Duration,
    pub(crate) event_listeners: EventListeners<TimeoutEvent>,
    pub(crate) name: String,
}

impl AttemptTimeoutConfig {
    pub fn builder() -> AttemptTimeoutConfigBuilder {
        AttemptTimeoutConfigBuilder::new()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`AttemptTimeoutConfig`].
pub struct AttemptTimeoutConfigBuilder {
    timeout: Duration,
    event_listeners: EventListeners<TimeoutEvent>,
    name: String,
}

impl Default for AttemptTimeoutConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptTimeoutConfigBuilder {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Deadline for a single attempt, measured from the moment the attempt
    /// is issued.
    ///
    /// Default: 10 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TimeoutEvent| {
                if let TimeoutEvent::Success { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TimeoutEvent| {
                if let TimeoutEvent::Error { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    /// Registers a callback invoked with the configured timeout whenever
    /// the deadline fires.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TimeoutEvent| {
                if let TimeoutEvent::Timeout { timeout, .. } = event {
                    f(*timeout);
                }
            }));
        self
    }

    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TimeoutEvent| {
                if matches!(event, TimeoutEvent::Cancelled { .. }) {
                    f();
                }
            }));
        self
    }

    pub fn build_config(self) -> AttemptTimeoutConfig {
        AttemptTimeoutConfig {
            timeout: self.timeout,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    pub fn build(self) -> AttemptTimeoutLayer {
        AttemptTimeoutLayer::new(self.build_config())
    }
}
