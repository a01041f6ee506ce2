//! Typed events shared by every interceptor in the pipeline.
//!
//! Each interceptor defines its own event enum and implements
//! [`OutboundEvent`] for it. Listeners are registered through the
//! interceptor's builder (`on_retry`, `on_state_transition`, ...) and are
//! stored in an [`EventListeners`] collection.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// An event raised by an interceptor.
pub trait OutboundEvent: Send + Sync + fmt::Debug {
    /// Short, stable identifier of the event kind (e.g. `"retry"`, `"state_transition"`).
    fn event_type(&self) -> &'static str;

    /// When the event was raised.
    fn timestamp(&self) -> Instant;

    /// Name of the interceptor instance that raised the event.
    fn component_name(&self) -> &str;
}

/// Receives events of one type.
pub trait EventListener<E: OutboundEvent>: Send + Sync {
    /// Called synchronously on the request path; keep it cheap.
    fn on_event(&self, event: &E);
}

/// Shared, type-erased listener.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered set of listeners for one event type.
#[derive(Clone)]
pub struct EventListeners<E: OutboundEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: OutboundEvent> EventListeners<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Appends a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener in registration order.
    ///
    /// A panicking listener is isolated: the panic is caught and delivery
    /// continues with the next listener.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let delivered = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
            if delivered.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    component = event.component_name(),
                    event_type = event.event_type(),
                    "event listener panicked"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!("outbound_listener_panics_total", "event_type" => event.event_type())
                    .increment(1);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: OutboundEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: OutboundEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
