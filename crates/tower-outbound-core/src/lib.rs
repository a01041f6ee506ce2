//! Core infrastructure for tower-outbound.
//!
//! Shared by every interceptor crate:
//! - the event system used for observability
//! - the [`OutboundError`] failure taxonomy
//! - [`OutboundRequest`], the request type carried through the chain
//! - [`SignalContext`], typed per-call signals

pub mod error;
pub mod events;
pub mod request;
pub mod signal;

pub use error::{BoxError, OutboundError};
pub use events::{EventListener, EventListeners, FnListener, OutboundEvent};
pub use request::OutboundRequest;
pub use signal::SignalContext;

/// Re-exported so downstream crates name one cancellation type.
pub use tokio_util::sync::CancellationToken;
