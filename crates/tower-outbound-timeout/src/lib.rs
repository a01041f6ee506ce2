//! Per-attempt timeouts for outbound HTTP calls.
//!
//! [`AttemptTimeout`] bounds a single attempt by composing two sources of
//! cancellation: its own deadline and the caller's
//! [`CancellationToken`](tower_outbound_core::CancellationToken).
//!
//! - When the deadline fires first the attempt fails with
//!   [`OutboundError::Timeout`], which the retry engine treats as retryable.
//! - When the caller cancels first the attempt fails with
//!   [`OutboundError::Cancelled`], which is never retried.
//! - If both have fired by the time the attempt is observed, the deadline
//!   wins and the outcome is a timeout.
//!
//! The inner service receives a child of the caller's token. It is
//! cancelled when the caller cancels, when the deadline fires, and when
//! the attempt is abandoned, so a transport that watches it can stop work
//! early. A transport that ignores it keeps running in the background and
//! its result is discarded.
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use std::time::Duration;
//! use tower::{Layer, Service, ServiceExt, service_fn};
//! use tower_outbound_core::{OutboundError, OutboundRequest};
//! use tower_outbound_timeout::AttemptTimeoutLayer;
//!
//! # async fn example() {
//! let layer = AttemptTimeoutLayer::builder()
//!     .timeout(Duration::from_millis(50))
//!     .on_timeout(|after| eprintln!("attempt gave up after {after:?}"))
//!     .build();
//!
//! let slow = service_fn(|_req: OutboundRequest| async {
//!     tokio::time::sleep(Duration::from_secs(1)).await;
//!     Ok::<_, OutboundError>(Response::new(Bytes::new()))
//! });
//!
//! let mut client = layer.layer(slow);
//! let request = OutboundRequest::new(Request::get("http://search/q").body(Bytes::new()).unwrap());
//! let err = client.ready().await.unwrap().call(request).await.unwrap_err();
//! assert!(err.is_timeout() && err.is_retryable());
//! # }
//! ```

mod config;
mod events;
mod layer;

pub use config::{AttemptTimeoutConfig, AttemptTimeoutConfigBuilder, DEFAULT_ATTEMPT_TIMEOUT};
pub use events::TimeoutEvent;
pub use layer::AttemptTimeoutLayer;

use futures::future::BoxFuture;
use http::Response;
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::{timeout_at, Instant};
use tower::Service;
use tower_outbound_core::{OutboundError, OutboundRequest};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// A Tower [`Service`] that bounds each call with a deadline.
#[derive(Clone)]
pub struct AttemptTimeout<S> {
    inner: S,
    config: Arc<AttemptTimeoutConfig>,
}

impl<S> AttemptTimeout<S> {
    pub fn new(inner: S, config: Arc<AttemptTimeoutConfig>) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &AttemptTimeoutConfig {
        &self.config
    }
}

impl<S, B, RB> Service<OutboundRequest<B>> for AttemptTimeout<S>
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

    fn call(&mut self, mut req: OutboundRequest<B>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let caller = req.cancellation().clone();
        if caller.is_cancelled() {
            return Box::pin(async { Err::<Response<RB>, _>(OutboundError::Cancelled) });
        }

        let start = Instant::now();
        let deadline = start + config.timeout;
        let attempt = caller.child_token();
        req.set_cancellation(attempt.clone());
        let fut = self.inner.call(req);
        let attempt = attempt.drop_guard();

        Box::pin(async move {
            let outcome = tokio::select! {
                biased;
                finished = timeout_at(deadline, fut) => finished,
                _ = caller.cancelled() => {
                    let duration = start.elapsed();
                    config.event_listeners.emit(&TimeoutEvent::Cancelled {
                        component_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        duration,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("attempt_timeout_calls_total", "timeout" => config.name.clone(), "result" => "cancelled").increment(1);

                    #[cfg(feature = "tracing")]
                    debug!(timeout = %config.name, elapsed_ms = duration.as_millis() as u64, "attempt cancelled by caller");

                    return Err(OutboundError::Cancelled);
                }
            };

            match outcome {
                Ok(result) => {
                    let duration = start.elapsed();
                    let (event, _label) = match &result {
                        Ok(_) => (
                            TimeoutEvent::Success {
                                component_name: config.name.clone(),
                                timestamp: std::time::Instant::now(),
                                duration,
                            },
                            "success",
                        ),
                        Err(_) => (
                            TimeoutEvent::Error {
                                component_name: config.name.clone(),
                                timestamp: std::time::Instant::now(),
                                duration,
                            },
                            "error",
                        ),
                    };
                    config.event_listeners.emit(&event);

                    #[cfg(feature = "metrics")]
                    {
                        counter!("attempt_timeout_calls_total", "timeout" => config.name.clone(), "result" => _label).increment(1);
                        histogram!("attempt_timeout_call_duration_seconds", "timeout" => config.name.clone())
                            .record(duration.as_secs_f64());
                    }

                    result
                }
                Err(_elapsed) => {
                    // Tell the transport to stop; its eventual result is discarded.
                    attempt.disarm().cancel();

                    config.event_listeners.emit(&TimeoutEvent::Timeout {
                        component_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        timeout: config.timeout,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("attempt_timeout_calls_total", "timeout" => config.name.clone(), "result" => "timeout").increment(1);

                    #[cfg(feature = "tracing")]
                    warn!(
                        timeout = %config.name,
                        timeout_ms = config.timeout.as_millis() as u64,
                        "attempt timed out"
                    );

                    Err(OutboundError::Timeout {
                        timeout: config.timeout,
                    })
                }
            }
        })
    }
}
