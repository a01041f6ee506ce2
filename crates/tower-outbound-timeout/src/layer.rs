use crate::config::{AttemptTimeoutConfig, AttemptTimeoutConfigBuilder};
use crate::AttemptTimeout;
use std::sync::Arc;
use tower::layer::Layer;

/// A Tower layer that bounds each attempt with a deadline.
///
/// ```
/// use std::time::Duration;
/// use tower_outbound_timeout::AttemptTimeoutLayer;
///
/// let layer = AttemptTimeoutLayer::builder()
///     .timeout(Duration::from_millis(800))
///     .name("search")
///     .build();
/// ```
#[derive(Clone)]
pub struct AttemptTimeoutLayer {
    config: Arc<AttemptTimeoutConfig>,
}

impl AttemptTimeoutLayer {
    pub fn new(config: AttemptTimeoutConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn builder() -> AttemptTimeoutConfigBuilder {
        AttemptTimeoutConfigBuilder::new()
    }

    pub fn config(&self) -> &AttemptTimeoutConfig {
        &self.config
    }
}

impl From<AttemptTimeoutConfig> for AttemptTimeoutLayer {
    fn from(config: AttemptTimeoutConfig) -> Self {
        Self::new(config)
    }
}

impl<S> Layer<S> for AttemptTimeoutLayer {
    type Service = AttemptTimeout<S>;

    fn layer(&self, service: S) -> Self::Service {
        AttemptTimeout::new(service, Arc::clone(&self.config))
    }
}
