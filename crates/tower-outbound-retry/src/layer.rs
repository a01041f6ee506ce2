use crate::{Retry, RetryConfig};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that wraps a service with the retry engine.
///
/// The configuration (and any budget it holds) is shared by every service
/// the layer produces.
///
/// ```
/// use tower_outbound_retry::RetryLayer;
/// use std::time::Duration;
///
/// let layer = RetryLayer::builder()
///     .retry_count(2)
///     .seed_delay(Duration::from_millis(50))
///     .name("inventory")
///     .build();
/// ```
#[derive(Clone)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn builder() -> crate::RetryConfigBuilder {
        crate::RetryConfigBuilder::new()
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
