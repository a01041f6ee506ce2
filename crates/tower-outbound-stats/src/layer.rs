use crate::aggregator::{Aggregation, IntervalAggregator};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// What a [`Measure`] service adds for each finished call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// The call's wall time in milliseconds.
    ElapsedMillis,
    /// `1.0`, so a [`CountAggregator`](crate::CountAggregator) sums calls
    /// per interval.
    Throughput,
}

/// A Tower layer that feeds one sample per call into a shared aggregator.
///
/// [`new`](Self::new) records each call's wall time in milliseconds;
/// [`throughput`](Self::throughput) records `1.0` per call. The sample is
/// taken once the call has finished, whatever its outcome. A call that is
/// dropped before finishing is measured at the moment it is dropped.
///
/// ```
/// use std::sync::Arc;
/// use tower_outbound_core::BoxError;
/// use tower_outbound_stats::{HistogramAggregator, HistogramRecord, MeasureLayer, StatsSettings};
///
/// let latency = Arc::new(
///     HistogramAggregator::histogram(
///         StatsSettings::new("inventory.latency_ms", 10),
///         |_: &str, _: &HistogramRecord| -> Result<(), BoxError> { Ok(()) },
///     )
///     .unwrap(),
/// );
/// let layer = MeasureLayer::new(Arc::clone(&latency));
/// ```
pub struct MeasureLayer<A> {
    aggregator: Arc<IntervalAggregator<A>>,
    sample: Sample,
}

impl<A> MeasureLayer<A> {
    pub fn new(aggregator: Arc<IntervalAggregator<A>>) -> Self {
        Self {
            aggregator,
            sample: Sample::ElapsedMillis,
        }
    }

    /// Counts finished calls instead of timing them.
    pub fn throughput(aggregator: Arc<IntervalAggregator<A>>) -> Self {
        Self {
            aggregator,
            sample: Sample::Throughput,
        }
    }

    pub fn aggregator(&self) -> &Arc<IntervalAggregator<A>> {
        &self.aggregator
    }

    pub fn sample(&self) -> Sample {
        self.sample
    }
}

impl<A> Clone for MeasureLayer<A> {
    fn clone(&self) -> Self {
        Self {
            aggregator: Arc::clone(&self.aggregator),
            sample: self.sample,
        }
    }
}

impl<S, A> Layer<S> for MeasureLayer<A> {
    type Service = Measure<S, A>;

    fn layer(&self, inner: S) -> Self::Service {
        Measure {
            inner,
            aggregator: Arc::clone(&self.aggregator),
            sample: self.sample,
        }
    }
}

/// The service produced by [`MeasureLayer`].
pub struct Measure<S, A> {
    inner: S,
    aggregator: Arc<IntervalAggregator<A>>,
    sample: Sample,
}

impl<S: Clone, A> Clone for Measure<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            aggregator: Arc::clone(&self.aggregator),
            sample: self.sample,
        }
    }
}

struct Stopwatch<A: Aggregation> {
    aggregator: Arc<IntervalAggregator<A>>,
    sample: Sample,
    start: Instant,
}

impl<A: Aggregation> Drop for Stopwatch<A> {
    fn drop(&mut self) {
        let value = match self.sample {
            Sample::ElapsedMillis => self.start.elapsed().as_secs_f64() * 1_000.0,
            Sample::Throughput => 1.0,
        };
        self.aggregator.add(value);
    }
}

impl<S, A, Req> Service<Req> for Measure<S, A>
where
    S: Service<Req>,
    S::Future: Send + 'static,
    A: Aggregation,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let stopwatch = Stopwatch {
            aggregator: Arc::clone(&self.aggregator),
            sample: self.sample,
            start: Instant::now(),
        };
        let fut = self.inner.call(req);
        Box::pin(async move {
            let result = fut.await;
            drop(stopwatch);
            result
        })
    }
}
