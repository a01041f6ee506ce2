//! Retry budget: caps the share of in-flight calls that are retries.
//!
//! Per-call backoff spaces out one caller's retries, but during an outage
//! every caller retries at once. The budget watches live load across all
//! calls to a dependency and refuses a retry attempt when retries already
//! make up more than `threshold` of the attempts in flight.
//!
//! Counting works per attempt:
//! - every admitted attempt increments `in_flight`
//! - attempts with index `>= 1` also increment `retries_in_flight`
//! - both increments are undone when the attempt's [`BudgetTicket`] drops,
//!   whatever the attempt's outcome
//!
//! The ratio is evaluated after the candidate retry has been counted, so a
//! lone call on its first retry sees a ratio of `1.0`.
//!
//! Reads and updates are lock-free and not linearizable as a group;
//! concurrent admissions may let a few extra retries through, or refuse a
//! few too many.

#[cfg(feature = "metrics")]
use metrics::counter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
#[cfg(feature = "tracing")]
use tracing::warn;
use tower_outbound_core::OutboundError;

/// Shared ratio governor for one dependency.
#[derive(Debug)]
pub struct RetryBudget {
    name: String,
    threshold: f64,
    in_flight: AtomicUsize,
    retries_in_flight: AtomicUsize,
}

impl RetryBudget {
    /// Creates a budget allowing retries to be up to `threshold` (a fraction
    /// in `[0, 1]`, clamped) of in-flight attempts.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            0.0
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self {
            name: "<unnamed>".to_string(),
            threshold,
            in_flight: AtomicUsize::new(0),
            retries_in_flight: AtomicUsize::new(0),
        }
    }

    /// Creates a budget from a percentage, e.g. `10.0` for 10%.
    pub fn from_percentage(percentage: f64) -> Self {
        Self::new(percentage / 100.0)
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Attempts currently holding a ticket.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Retry attempts currently holding a ticket.
    pub fn retries_in_flight(&self) -> usize {
        self.retries_in_flight.load(Ordering::Acquire)
    }

    /// `retries_in_flight / in_flight`, or `0.0` when nothing is in flight.
    pub fn ratio(&self) -> f64 {
        ratio(self.retries_in_flight(), self.in_flight())
    }

    /// Admits attempt number `attempt` (0-based) or refuses it.
    ///
    /// First attempts are always admitted. A refused retry fails with
    /// [`OutboundError::RetryBudgetExceeded`], which the retry engine
    /// treats as terminal.
    pub fn admit(self: &Arc<Self>, attempt: usize) -> Result<BudgetTicket, OutboundError> {
        let is_retry = attempt >= 1;
        let total = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        let ticket = BudgetTicket {
            budget: Arc::clone(self),
            is_retry,
        };
        if !is_retry {
            return Ok(ticket);
        }

        let retries = self.retries_in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        let ratio = ratio(retries, total);
        if ratio > self.threshold {
            drop(ticket);

            #[cfg(feature = "tracing")]
            warn!(
                budget = %self.name,
                attempt,
                ratio,
                threshold = self.threshold,
                "retry rejected by budget"
            );

            #[cfg(feature = "metrics")]
            counter!("retry_budget_rejections_total", "budget" => self.name.clone()).increment(1);

            return Err(OutboundError::RetryBudgetExceeded {
                name: self.name.clone(),
                ratio,
                threshold: self.threshold,
            });
        }
        Ok(ticket)
    }
}

fn ratio(retries: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        retries as f64 / total as f64
    }
}

/// Proof of admission for one attempt. Dropping it releases the attempt's
/// share of the counters.
#[derive(Debug)]
pub struct BudgetTicket {
    budget: Arc<RetryBudget>,
    is_retry: bool,
}

impl BudgetTicket {
    pub fn is_retry(&self) -> bool {
        self.is_retry
    }
}

impl Drop for BudgetTicket {
    fn drop(&mut self) {
        if self.is_retry {
            self.budget.retries_in_flight.fetch_sub(1, Ordering::AcqRel);
        }
        self.budget.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
