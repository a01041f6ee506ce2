//! Failure classification for breaker statistics.
//!
//! The breaker must count at least everything the retry engine retries
//! (transport failures, timeouts, 5xx and 429), because every retry adds
//! load on the dependency.

use http::{Response, StatusCode};
use tower_outbound_core::OutboundError;

/// What a finished call produced, as seen by a classifier.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Status(StatusCode),
    Error(&'a OutboundError),
}

impl<'a> Outcome<'a> {
    pub fn of<B>(result: &'a Result<Response<B>, OutboundError>) -> Self {
        match result {
            Ok(response) => Outcome::Status(response.status()),
            Err(error) => Outcome::Error(error),
        }
    }
}

/// Decides whether an outcome counts as a failure.
pub trait FailureClassifier: Send + Sync {
    fn is_failure(&self, outcome: Outcome<'_>) -> bool;
}

/// The default classifier.
///
/// Failures:
/// - any `OutboundError` (transport, timeout, cancellation, exceeded budget,
///   other), except a `CircuitOpen` produced by a nested breaker
/// - 5xx responses
/// - 429 responses
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFailureClassifier;

impl FailureClassifier for HttpFailureClassifier {
    fn is_failure(&self, outcome: Outcome<'_>) -> bool {
        match outcome {
            Outcome::Status(status) => {
                status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
            }
            Outcome::Error(error) => !error.is_circuit_open(),
        }
    }
}

/// A classifier backed by a closure.
///
/// ```rust
/// use http::StatusCode;
/// use tower_outbound_circuitbreaker::{FailureClassifier, FnClassifier, Outcome};
///
/// // Only count server errors, not rate limiting or client-side failures.
/// let classifier = FnClassifier::new(|outcome: Outcome<'_>| {
///     matches!(outcome, Outcome::Status(s) if s.is_server_error())
/// });
///
/// assert!(classifier.is_failure(Outcome::Status(StatusCode::BAD_GATEWAY)));
/// assert!(!classifier.is_failure(Outcome::Status(StatusCode::TOO_MANY_REQUESTS)));
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: F,
}

impl<F> FnClassifier<F>
where
    F: Fn(Outcome<'_>) -> bool + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FailureClassifier for FnClassifier<F>
where
    F: Fn(Outcome<'_>) -> bool + Send + Sync,
{
    fn is_failure(&self, outcome: Outcome<'_>) -> bool {
        (self.f)(outcome)
    }
}
