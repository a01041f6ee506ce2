//! The interval ticker shared by every aggregation.

use crate::error::StatsError;
use crate::schedule::delay_until_next_tick;
use crate::settings::StatsSettings;
#[cfg(feature = "metrics")]
use metrics::counter;
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
#[cfg(feature = "tracing")]
use tracing::{debug, error};

/// The per-metric state an [`IntervalAggregator`] drives.
///
/// `add` runs on the request path and must only hold its lock briefly.
/// `aggregate` runs on the ticker: it takes the interval's samples, resets
/// the state and emits.
pub trait Aggregation: Send + Sync + 'static {
    fn add(&self, value: f64);

    fn aggregate(&self, metric: &str) -> Result<(), StatsError>;
}

type ErrorCallback = Arc<dyn Fn(&StatsError) + Send + Sync>;

struct Shared<A> {
    aggregation: A,
    settings: StatsSettings,
    on_error: RwLock<Option<ErrorCallback>>,
}

impl<A: Aggregation> Shared<A> {
    fn aggregate(&self) -> Result<(), StatsError> {
        let metric = &self.settings.metric_name;
        match catch_unwind(AssertUnwindSafe(|| self.aggregation.aggregate(metric))) {
            Ok(result) => result,
            Err(_) => Err(StatsError::Panicked {
                metric: metric.clone(),
            }),
        }
    }

    fn tick(&self) {
        if let Err(err) = self.aggregate() {
            self.report(&err);
        }
    }

    fn report(&self, err: &StatsError) {
        #[cfg(feature = "tracing")]
        error!(metric = %self.settings.metric_name, error = %err, "stats aggregation failed");

        #[cfg(feature = "metrics")]
        counter!("stats_aggregation_errors_total", "metric" => self.settings.metric_name.clone())
            .increment(1);

        let on_error = self.on_error.read().clone();
        if let Some(on_error) = on_error {
            let _ = catch_unwind(AssertUnwindSafe(|| on_error(err)));
        }
    }
}

/// Runs one tick on the blocking pool so sorting a large interval never
/// stalls a runtime worker.
async fn tick_blocking<A: Aggregation>(shared: &Arc<Shared<A>>) {
    let shared = Arc::clone(shared);
    let _ = tokio::task::spawn_blocking(move || shared.tick()).await;
}

struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs an [`Aggregation`] on interval boundaries.
///
/// Ticks are aligned to multiples of the interval since midnight UTC (see
/// [`next_interval_delay`](crate::next_interval_delay)). Each tick hands
/// the interval's samples to the emitter; errors go to the callback set
/// with [`on_error`](Self::on_error) and the ticker keeps going.
///
/// Aggregators are long-lived and usually shared behind an [`Arc`], for
/// instance by a [`MeasureLayer`](crate::MeasureLayer).
///
/// ```
/// use tower_outbound_core::BoxError;
/// use tower_outbound_stats::{HistogramAggregator, HistogramRecord, StatsSettings};
///
/// # async fn example() -> Result<(), tower_outbound_stats::StatsError> {
/// let latency = HistogramAggregator::histogram(
///     StatsSettings::new("inventory.latency_ms", 10),
///     |metric: &str, record: &HistogramRecord| -> Result<(), BoxError> {
///         println!("{metric}: n={} p99={}", record.n, record.p99);
///         Ok(())
///     },
/// )?
/// .on_error(|err| eprintln!("stats: {err}"));
///
/// latency.start()?;
/// latency.add(12.0);
/// latency.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct IntervalAggregator<A> {
    shared: Arc<Shared<A>>,
    ticker: Mutex<Option<Ticker>>,
    shut_down: AtomicBool,
}

impl<A: Aggregation> IntervalAggregator<A> {
    /// Wraps `aggregation` after checking the interval against
    /// `[1, max_interval_secs]`.
    pub fn new(
        settings: StatsSettings,
        max_interval_secs: u64,
        aggregation: A,
    ) -> Result<Self, StatsError> {
        settings.validate(max_interval_secs)?;
        Ok(Self {
            shared: Arc::new(Shared {
                aggregation,
                settings,
                on_error: RwLock::new(None),
            }),
            ticker: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Sets the callback that receives aggregation failures.
    pub fn on_error<F>(self, f: F) -> Self
    where
        F: Fn(&StatsError) + Send + Sync + 'static,
    {
        self.set_on_error(f);
        self
    }

    /// Replaces the error callback. A running ticker reports to the new
    /// callback from its next failure on.
    pub fn set_on_error<F>(&self, f: F)
    where
        F: Fn(&StatsError) + Send + Sync + 'static,
    {
        *self.shared.on_error.write() = Some(Arc::new(f));
    }

    pub fn settings(&self) -> &StatsSettings {
        &self.shared.settings
    }

    pub fn aggregation(&self) -> &A {
        &self.shared.aggregation
    }

    pub fn add(&self, value: f64) {
        self.shared.aggregation.add(value);
    }

    pub fn is_running(&self) -> bool {
        self.ticker.lock().is_some()
    }

    /// Spawns the ticker on the current Tokio runtime. Starting a running
    /// aggregator does nothing.
    pub fn start(&self) -> Result<(), StatsError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(StatsError::ShutDown {
                metric: self.shared.settings.metric_name.clone(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StatsError::NoRuntime)?;

        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            return Ok(());
        }

        let token = CancellationToken::new();
        let handle = runtime.spawn(run(
            Arc::clone(&self.shared),
            self.shared.settings.interval(),
            token.clone(),
        ));
        *ticker = Some(Ticker { token, handle });

        #[cfg(feature = "tracing")]
        debug!(
            metric = %self.shared.settings.metric_name,
            interval_secs = self.shared.settings.interval_secs,
            "stats ticker started"
        );
        Ok(())
    }

    /// Cancels the ticker and waits for it to finish. A tick already in
    /// progress completes first.
    pub async fn stop(&self) {
        let ticker = self.ticker.lock().take();
        if let Some(Ticker { token, handle }) = ticker {
            token.cancel();
            let _ = handle.await;

            #[cfg(feature = "tracing")]
            debug!(metric = %self.shared.settings.metric_name, "stats ticker stopped");
        }
    }

    /// Aggregates and emits whatever has been added since the last tick.
    pub fn flush(&self) -> Result<(), StatsError> {
        self.shared.aggregate()
    }

    /// Stops the ticker, then flushes the current interval once.
    ///
    /// The ticker has fully stopped before the final flush runs. A flush
    /// failure is reported to the error callback. The aggregator cannot be restarted
    /// afterwards.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.stop().await;
        tick_blocking(&self.shared).await;
    }
}

async fn run<A: Aggregation>(shared: Arc<Shared<A>>, interval: Duration, token: CancellationToken) {
    loop {
        // Recomputed every time so drift never accumulates.
        let delay = delay_until_next_tick(interval);
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        tick_blocking(&shared).await;
    }
}

impl<A> Drop for IntervalAggregator<A> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.token.cancel();
        }
    }
}

impl<A> std::fmt::Debug for IntervalAggregator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalAggregator")
            .field("settings", &self.shared.settings)
            .field("running", &self.ticker.lock().is_some())
            .finish()
    }
}
