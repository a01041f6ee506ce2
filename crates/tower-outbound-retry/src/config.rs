use crate::backoff::{Backoff, DecorrelatedJitter, FixedBackoff, DEFAULT_MAX_DELAY};
use crate::budget::RetryBudget;
use crate::events::RetryEvent;
use crate::layer::RetryLayer;
use crate::policy::{RetryPolicy, RetryReason};
use crate::retry_after::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tower_outbound_core::events::{EventListeners, FnListener};

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_COUNT: usize = 3;

/// Default seed for decorrelated jitter.
pub const DEFAULT_SEED_DELAY: Duration = Duration::from_millis(100);

/// Configuration for the retry engine.
pub struct RetryConfig {
    pub(crate) policy: RetryPolicy,
    pub(crate) backoff: Arc<dyn Backoff>,
    pub(crate) budget: Option<Arc<RetryBudget>>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Retries allowed after the first attempt.
    pub fn retry_count(&self) -> usize {
        self.policy.retry_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn budget(&self) -> Option<&Arc<RetryBudget>> {
        self.budget.as_ref()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    retry_count: usize,
    seed_delay: Duration,
    max_delay: Duration,
    backoff: Option<Arc<dyn Backoff>>,
    budget: Option<Arc<RetryBudget>>,
    retry_on_signal: bool,
    clock: Arc<dyn Clock>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - retry_count: 3 (four attempts in total)
    /// - backoff: decorrelated jitter seeded at 100ms, capped at 30s
    /// - budget: none
    /// - retry_on_signal: false
    /// - clock: system clock
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            seed_delay: DEFAULT_SEED_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff: None,
            budget: None,
            retry_on_signal: false,
            clock: Arc::new(SystemClock),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets how many retries may follow the first attempt.
    ///
    /// `0` disables retrying; the call makes exactly one attempt.
    pub fn retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Seed delay for decorrelated jitter.
    pub fn seed_delay(mut self, seed_delay: Duration) -> Self {
        self.seed_delay = seed_delay;
        self
    }

    /// Upper bound on any single jittered delay.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sleeps the same `delay` before every retry instead of jittering.
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.backoff = Some(Arc::new(FixedBackoff::new(delay)));
        self
    }

    /// Uses a custom schedule. Overrides `seed_delay` and `max_delay`.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: Backoff + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Shares a retry budget with every call through this layer.
    ///
    /// The budget is usually shared between all layers talking to one
    /// dependency:
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use tower_outbound_retry::{RetryBudget, RetryLayer};
    ///
    /// let budget = Arc::new(RetryBudget::from_percentage(10.0).named("inventory"));
    ///
    /// let layer = RetryLayer::builder()
    ///     .retry_count(3)
    ///     .budget(Arc::clone(&budget))
    ///     .build();
    /// ```
    pub fn budget(mut self, budget: Arc<RetryBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Also retries when a downstream interceptor sets
    /// [`SignalContext::request_retry`](tower_outbound_core::SignalContext::request_retry)
    /// during an attempt.
    pub fn retry_on_signal(mut self, enabled: bool) -> Self {
        self.retry_on_signal = enabled;
        self
    }

    /// Clock used to resolve HTTP-date `Retry-After` values.
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the name used in events, logs and metrics.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each retry sleep.
    ///
    /// Receives the index of the attempt that failed, the delay about to be
    /// slept and the reason for retrying.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration, RetryReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Retry {
                attempt,
                delay,
                reason,
                ..
            } = event
            {
                f(*attempt, *delay, *reason);
            }
        }));
        self
    }

    /// Registers a callback for calls that ended without needing a retry.
    ///
    /// Receives the number of attempts made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback for calls that ran out of retries.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback for failures that are never retried.
    pub fn on_not_retried<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::NotRetried { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback for retries refused by the budget.
    ///
    /// Receives the refused attempt index and the ratio that tripped it.
    pub fn on_budget_exceeded<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, f64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::BudgetExceeded { attempt, ratio, .. } = event {
                f(*attempt, *ratio);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> RetryConfig {
        let backoff = self.backoff.unwrap_or_else(|| {
            Arc::new(DecorrelatedJitter::new(self.seed_delay).max_delay(self.max_delay))
        });
        RetryConfig {
            policy: RetryPolicy {
                retry_count: self.retry_count,
                retry_on_signal: self.retry_on_signal,
                clock: self.clock,
            },
            backoff,
            budget: self.budget,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the retry layer.
    pub fn build(self) -> RetryLayer {
        RetryLayer::new(self.build_config())
    }
}
