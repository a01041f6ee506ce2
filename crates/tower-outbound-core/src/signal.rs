//! Per-call signals exchanged between interceptors that are not adjacent
//! in the chain.
//!
//! A [`SignalContext`] is created once per logical call and travels with
//! the request. Every attempt of a retried call sees the same context, so
//! an interceptor sitting below the retry engine can ask for another
//! attempt, and the retry engine can tell everything below it which
//! attempt is in flight.
//!
//! Fields are typed and named; an unset field reads as its default.
//!
//! ```
//! use tower_outbound_core::SignalContext;
//!
//! let signals = SignalContext::new();
//! assert_eq!(signals.retry_attempt(), 0);
//! assert!(!signals.retry_requested());
//!
//! // A response-inspecting interceptor downstream of the retry engine:
//! signals.request_retry();
//! assert!(signals.retry_requested());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Signals {
    retry_attempt: AtomicU32,
    retry_requested: AtomicBool,
    fault_window: AtomicBool,
}

/// Shared, typed signal bag for one logical call. Cloning shares the bag.
#[derive(Clone, Default)]
pub struct SignalContext {
    inner: Arc<Signals>,
}

impl SignalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the attempt currently in flight; `0` is the first attempt.
    pub fn retry_attempt(&self) -> u32 {
        self.inner.retry_attempt.load(Ordering::Acquire)
    }

    /// Written by the retry engine before each attempt is sent.
    pub fn set_retry_attempt(&self, attempt: u32) {
        self.inner.retry_attempt.store(attempt, Ordering::Release);
    }

    /// `true` when the in-flight attempt is a retry.
    pub fn is_retry(&self) -> bool {
        self.retry_attempt() >= 1
    }

    /// Asks the retry engine to retry the current attempt.
    pub fn request_retry(&self) {
        self.inner.retry_requested.store(true, Ordering::Release);
    }

    pub fn retry_requested(&self) -> bool {
        self.inner.retry_requested.load(Ordering::Acquire)
    }

    /// Clears and returns the retry request.
    pub fn take_retry_request(&self) -> bool {
        self.inner.retry_requested.swap(false, Ordering::AcqRel)
    }

    /// Marks the call as having run inside an injected fault window.
    pub fn set_fault_window(&self, active: bool) {
        self.inner.fault_window.store(active, Ordering::Release);
    }

    pub fn in_fault_window(&self) -> bool {
        self.inner.fault_window.load(Ordering::Acquire)
    }

    /// Whether two handles point at the same call's bag.
    pub fn same_call(&self, other: &SignalContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SignalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalContext")
            .field("retry_attempt", &self.retry_attempt())
            .field("retry_requested", &self.retry_requested())
            .field("fault_window", &self.in_fault_window())
            .finish()
    }
}
