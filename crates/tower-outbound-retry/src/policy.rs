//! Retry eligibility.

use crate::retry_after::{retry_after, Clock};
use chrono::{DateTime, Utc};
use http::{HeaderMap, Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tower_outbound_core::OutboundError;

/// Why an attempt is being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The response status is retry-eligible.
    Status(StatusCode),
    /// The transport failed transiently.
    Transport,
    /// The attempt hit its deadline.
    Timeout,
    /// A downstream interceptor asked for a retry.
    Signal,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::Status(status) => write!(f, "status {}", status.as_u16()),
            RetryReason::Transport => f.write_str("transport failure"),
            RetryReason::Timeout => f.write_str("timeout"),
            RetryReason::Signal => f.write_str("retry signal"),
        }
    }
}

/// Whether a status belongs to the retry-eligible family (5xx or 429),
/// before any `Retry-After` consideration.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Decides whether a response may be retried after sleeping `planned_delay`.
///
/// Only 503 and 429 consult `Retry-After`:
/// - header present and parseable: retry only if the server's wait is no
///   longer than `planned_delay`; the server's value is never slept
/// - header absent or unparseable: 503 retries, 429 does not
///
/// Other 5xx statuses always retry; everything else never does.
pub fn should_retry_response(
    status: StatusCode,
    headers: &HeaderMap,
    planned_delay: Duration,
    now: DateTime<Utc>,
) -> bool {
    if !is_retryable_status(status) {
        return false;
    }
    if status != StatusCode::SERVICE_UNAVAILABLE && status != StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    match retry_after(headers, now) {
        Some(wait) => wait <= planned_delay,
        None => status == StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Outcome of evaluating one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Retry(RetryReason),
    Stop,
}

#[derive(Clone)]
pub(crate) struct RetryPolicy {
    pub(crate) retry_count: usize,
    pub(crate) retry_on_signal: bool,
    pub(crate) clock: Arc<dyn Clock>,
}

impl RetryPolicy {
    /// Evaluates an attempt that still has a planned delay available.
    pub(crate) fn evaluate<B>(
        &self,
        outcome: &Result<Response<B>, OutboundError>,
        planned_delay: Duration,
        signaled: bool,
    ) -> Verdict {
        if let Err(e) = outcome {
            if e.is_terminal() {
                return Verdict::Stop;
            }
        }
        if signaled && self.retry_on_signal {
            return Verdict::Retry(RetryReason::Signal);
        }
        match outcome {
            Ok(response) => {
                let status = response.status();
                if should_retry_response(
                    status,
                    response.headers(),
                    planned_delay,
                    self.clock.now(),
                ) {
                    Verdict::Retry(RetryReason::Status(status))
                } else {
                    Verdict::Stop
                }
            }
            Err(OutboundError::Transport(_)) => Verdict::Retry(RetryReason::Transport),
            Err(OutboundError::Timeout { .. }) => Verdict::Retry(RetryReason::Timeout),
            Err(_) => Verdict::Stop,
        }
    }

    /// Whether the outcome would have been retried given unlimited
    /// attempts. Used to tell exhaustion apart from a final answer.
    pub(crate) fn is_eligible<B>(
        &self,
        outcome: &Result<Response<B>, OutboundError>,
        signaled: bool,
    ) -> bool {
        match outcome {
            Err(e) if e.is_terminal() => false,
            _ if signaled && self.retry_on_signal => true,
            Ok(response) => is_retryable_status(response.status()),
            Err(e) => e.is_retryable(),
        }
    }
}
