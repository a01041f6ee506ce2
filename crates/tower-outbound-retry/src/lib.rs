//! Retry engine for outbound HTTP calls.
//!
//! [`Retry`] re-sends a request when an attempt ends in a transient
//! failure, a timeout, a 5xx or a rate-limited response, subject to:
//!
//! - **A precomputed schedule**: decorrelated-jitter delays are drawn once
//!   per call, before the first attempt. The schedule has exactly
//!   `retry_count` entries.
//! - **Retry-After**: for 503 and 429 a server-supplied wait is compared
//!   with the planned delay. The call is retried only if the server asked
//!   for no more than we were going to wait anyway; the planned delay is
//!   what gets slept.
//! - **An optional [`RetryBudget`]** shared across calls, refusing retries
//!   once they make up too large a share of in-flight attempts.
//! - **Signals**: the current attempt index is published on the request's
//!   [`SignalContext`](tower_outbound_core::SignalContext) before each
//!   attempt, and (with `retry_on_signal`) a downstream interceptor can
//!   request a retry.
//!
//! Caller cancellation, an open circuit and an exceeded budget end the
//! call immediately. When retries run out, the last outcome is returned
//! unchanged.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use std::time::Duration;
//! use tower::{Layer, Service, ServiceExt, service_fn};
//! use tower_outbound_core::{OutboundError, OutboundRequest};
//! use tower_outbound_retry::RetryLayer;
//!
//! # async fn example() -> Result<(), OutboundError> {
//! let layer = RetryLayer::builder()
//!     .retry_count(3)
//!     .seed_delay(Duration::from_millis(100))
//!     .on_retry(|attempt, delay, reason| {
//!         println!("attempt {attempt} failed ({reason}), retrying in {delay:?}");
//!     })
//!     .build();
//!
//! let transport = service_fn(|_req: OutboundRequest| async {
//!     Ok::<_, OutboundError>(Response::new(Bytes::from_static(b"ok")))
//! });
//!
//! let mut client = layer.layer(transport);
//! let request = OutboundRequest::new(Request::get("http://inventory/items").body(Bytes::new()).unwrap());
//! let response = client.ready().await?.call(request).await?;
//! assert_eq!(response.status(), StatusCode::OK);
//! # Ok(())
//! # }
//! ```

mod backoff;
mod budget;
mod config;
mod events;
mod layer;
mod policy;
mod retry_after;

pub use backoff::{Backoff, DecorrelatedJitter, FixedBackoff, DEFAULT_MAX_DELAY};
pub use budget::{BudgetTicket, RetryBudget};
pub use config::{RetryConfig, RetryConfigBuilder, DEFAULT_RETRY_COUNT, DEFAULT_SEED_DELAY};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{is_retryable_status, should_retry_response, RetryReason};
pub use retry_after::{parse_retry_after, retry_after, Clock, FixedClock, SystemClock};

use futures::future::BoxFuture;
use http::Response;
#[cfg(feature = "metrics")]
use metrics::counter;
use policy::Verdict;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};
use tower_outbound_core::{OutboundError, OutboundRequest};
#[cfg(feature = "tracing")]
use tracing::debug;

/// A Tower [`Service`] that retries outbound calls.
pub struct Retry<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S> Retry<S> {
    pub fn new(inner: S, config: Arc<RetryConfig>) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<S> Clone for Retry<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, B, RB> Service<OutboundRequest<B>> for Retry<S>
where
    S: Service<OutboundRequest<B>, Response = Response<RB>, Error = OutboundError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    B: Clone + Send + 'static,
    RB: Send + 'static,
{
    type Response = Response<RB>;
    type Error = OutboundError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: OutboundRequest<B>) -> Self::Future {
        // The service polled ready is the one that must serve the first attempt.
        let clone = self.inner.clone();
        let mut service = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);
        let delays = config.backoff.delays(config.policy.retry_count);

        Box::pin(async move {
            let signals = req.signals().clone();
            let cancellation = req.cancellation().clone();
            let mut attempt = 0usize;

            loop {
                signals.set_retry_attempt(u32::try_from(attempt).unwrap_or(u32::MAX));
                signals.take_retry_request();

                let ticket = match &config.budget {
                    Some(budget) => match budget.admit(attempt) {
                        Ok(ticket) => Some(ticket),
                        Err(error) => {
                            let ratio = match &error {
                                OutboundError::RetryBudgetExceeded { ratio, .. } => *ratio,
                                _ => budget.ratio(),
                            };
                            config.event_listeners.emit(&RetryEvent::BudgetExceeded {
                                component_name: config.name.clone(),
                                timestamp: Instant::now(),
                                attempt,
                                ratio,
                            });
                            return Err(error);
                        }
                    },
                    None => None,
                };

                if attempt > 0 {
                    service.ready().await?;
                }
                let outcome = service.call(req.clone()).await;
                drop(ticket);

                let signaled = signals.retry_requested();
                let planned = delays.get(attempt).copied();
                let verdict = match planned {
                    Some(planned) => config.policy.evaluate(&outcome, planned, signaled),
                    None => Verdict::Stop,
                };

                let reason = match verdict {
                    Verdict::Retry(reason) => reason,
                    Verdict::Stop => {
                        finish(&config, &outcome, attempt + 1, signaled);
                        return outcome;
                    }
                };

                let delay = planned.unwrap_or_default();
                config.event_listeners.emit(&RetryEvent::Retry {
                    component_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                    delay,
                    reason,
                });

                #[cfg(feature = "tracing")]
                debug!(
                    retry = %config.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %reason,
                    "retrying outbound call"
                );

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                // The previous response (if any) is released before sleeping.
                drop(outcome);

                tokio::select! {
                    _ = cancellation.cancelled() => return Err(OutboundError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        })
    }
}

fn finish<RB>(
    config: &RetryConfig,
    outcome: &Result<Response<RB>, OutboundError>,
    attempts: usize,
    signaled: bool,
) {
    let timestamp = Instant::now();
    let component_name = config.name.clone();
    let exhausted =
        attempts > config.policy.retry_count && config.policy.is_eligible(outcome, signaled);

    let (event, _label) = if exhausted {
        (
            RetryEvent::Exhausted {
                component_name,
                timestamp,
                attempts,
            },
            "exhausted",
        )
    } else if outcome.is_ok() {
        (
            RetryEvent::Success {
                component_name,
                timestamp,
                attempts,
            },
            "success",
        )
    } else {
        (
            RetryEvent::NotRetried {
                component_name,
                timestamp,
                attempts,
            },
            "not_retried",
        )
    };
    config.event_listeners.emit(&event);

    #[cfg(feature = "metrics")]
    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => _label).increment(1);
}
