//! Resilient outbound HTTP calls for Tower.
//!
//! `tower-outbound` bundles the component crates and adds [`Pipeline`], which
//! stacks them in the order their interplay depends on:
//!
//! ```text
//! caller -> [measure] -> retry -> circuit breaker -> attempt timeout -> transport
//! ```
//!
//! - [`retry`]: decorrelated-jitter backoff, `Retry-After` handling and an
//!   optional retry budget shared across calls
//! - [`circuitbreaker`]: a time-windowed breaker over failure rate and throughput
//! - [`timeout`]: a deadline for every attempt that also follows the caller's
//!   cancellation
//! - [`stats`]: count, gauge, rate and histogram aggregation on aligned
//!   intervals, plus a layer that measures call latency
//!
//! Each component is also usable on its own through its layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tower::{Layer, Service, ServiceExt};
//! use tower_outbound::{OutboundError, OutboundRequest, Pipeline, PipelineSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = PipelineSettings {
//!     name: "inventory".into(),
//!     retry_count: 2,
//!     attempt_timeout: Duration::from_millis(800),
//!     retry_budget_threshold: Some(0.2),
//!     ..Default::default()
//! };
//! let pipeline = Pipeline::from_settings(&settings)?;
//!
//! let transport = tower::service_fn(|_req: OutboundRequest<String>| async {
//!     Ok::<_, OutboundError>(http::Response::new(String::from("42")))
//! });
//! let mut service = pipeline.layer(transport);
//!
//! let request = http::Request::get("http://inventory/items/7").body(String::new())?;
//! let response = service.ready().await?.call(OutboundRequest::new(request)).await?;
//! assert_eq!(response.body(), "42");
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `tracing`: log decisions in every component
//! - `metrics`: record counters and histograms through the `metrics` facade
//! - `serde`: (de)serialize [`PipelineSettings`] and the stats settings

pub mod pipeline;
pub mod settings;

pub use pipeline::{Pipeline, PipelineBuilder, PipelineService};
pub use settings::{ConfigError, PipelineSettings};

pub use tower_outbound_circuitbreaker as circuitbreaker;
pub use tower_outbound_core as core;
pub use tower_outbound_retry as retry;
pub use tower_outbound_stats as stats;
pub use tower_outbound_timeout as timeout;

pub use tower_outbound_core::{
    BoxError, CancellationToken, OutboundError, OutboundRequest, SignalContext,
};
