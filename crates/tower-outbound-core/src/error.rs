//! The failure taxonomy shared by every interceptor.
//!
//! Status codes are *not* errors: a 503 travels up the chain as
//! `Ok(response)` and is judged by the retry policy and the breaker's
//! classifier. [`OutboundError`] covers the outcomes where no usable
//! response exists.
//!
//! | Variant | Retried | Counted by breaker |
//! |---|---|---|
//! | `Transport` | yes | yes |
//! | `Timeout` | yes | yes |
//! | `Cancelled` | never | yes |
//! | `CircuitOpen` | never | no (produced by the breaker) |
//! | `RetryBudgetExceeded` | never | yes |
//! | `Other` | no | yes |

use std::time::Duration;

/// Boxed error used as the source of transport and application failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failed outbound call.
#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    /// The transport could not deliver the request or read the response.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// One attempt ran past its internal deadline.
    #[error("timeout expired after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The caller cancelled the call.
    #[error("call cancelled by caller")]
    Cancelled,

    /// The breaker for this dependency is open and rejected the call.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    /// Too large a share of in-flight calls are already retries.
    #[error("retry budget '{name}' exceeded: retry ratio {ratio:.3} > threshold {threshold:.3}")]
    RetryBudgetExceeded {
        name: String,
        ratio: f64,
        threshold: f64,
    },

    /// Any other failure. Not retried.
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl OutboundError {
    /// Wraps an arbitrary error as a transient transport failure.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        OutboundError::Transport(error.into())
    }

    /// Wraps an arbitrary error as a non-retryable failure.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        OutboundError::Other(error.into())
    }

    /// Whether the retry engine may try again after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OutboundError::Transport(_) | OutboundError::Timeout { .. }
        )
    }

    /// Failures that end the call immediately, even when a downstream
    /// interceptor has requested a retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OutboundError::Cancelled
                | OutboundError::CircuitOpen { .. }
                | OutboundError::RetryBudgetExceeded { .. }
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, OutboundError::Transport(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, OutboundError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OutboundError::Cancelled)
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, OutboundError::CircuitOpen { .. })
    }

    pub fn is_retry_budget_exceeded(&self) -> bool {
        matches!(self, OutboundError::RetryBudgetExceeded { .. })
    }
}
