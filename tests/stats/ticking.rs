use super::{histogram_sink, scalar_sink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower_outbound_core::BoxError;
use tower_outbound_stats::{
    next_interval_delay, CountAggregator, HistogramAggregator, StatsError, StatsSettings, TICK_PAD,
};

#[tokio::test(start_paused = true)]
async fn the_ticker_emits_each_interval() {
    let (seen, sink) = histogram_sink();
    let histogram =
        HistogramAggregator::histogram(StatsSettings::new("latency_ms", 1), sink).unwrap();
    histogram.start().unwrap();

    histogram.add(3.0);
    histogram.add(1.0);
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(seen.lock()[0].1.n, 2);

    // Nothing was added, so the next tick emits nothing.
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(seen.lock().len(), 1);

    histogram.add(5.0);
    histogram.shutdown().await;
    assert_eq!(seen.lock().len(), 2);
    assert!(!histogram.is_running());
}

#[tokio::test(start_paused = true)]
async fn emitter_failures_reach_the_callback_and_ticking_continues() {
    let failures = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&failures);
    let count = CountAggregator::count(
        StatsSettings::new("writes", 1),
        |_: &str, _: f64| -> Result<(), BoxError> { Err("collector unreachable".into()) },
    )
    .unwrap()
    .on_error(move |err| {
        assert!(matches!(err, StatsError::Emit { metric, .. } if metric == "writes"));
        f.fetch_add(1, Ordering::SeqCst);
    });
    count.start().unwrap();

    for _ in 0..3 {
        count.add(1.0);
        tokio::time::sleep(Duration::from_millis(1_050)).await;
    }
    assert_eq!(failures.load(Ordering::SeqCst), 3);
    assert!(count.is_running());
    count.stop().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_emitting_for_good() {
    let (seen, sink) = scalar_sink();
    let count = CountAggregator::count(StatsSettings::new("writes", 1), sink).unwrap();
    count.start().unwrap();
    count.shutdown().await;

    count.add(1.0);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(seen.lock().is_empty());
    assert!(matches!(count.start(), Err(StatsError::ShutDown { .. })));
}

#[test]
fn ticks_land_on_interval_boundaries() {
    let ten = Duration::from_secs(10);
    // 12:00:03 UTC waits until 12:00:10 plus the pad.
    let now = Duration::from_secs(12 * 3600 + 3);
    assert_eq!(next_interval_delay(now, ten), Duration::from_secs(7) + TICK_PAD);

    // Exactly on a boundary waits a whole interval.
    let now = Duration::from_secs(12 * 3600);
    assert_eq!(next_interval_delay(now, ten), ten + TICK_PAD);

    // Just before midnight.
    let now = Duration::from_millis(86_399_999);
    assert_eq!(
        next_interval_delay(now, ten),
        Duration::from_millis(1) + TICK_PAD
    );
}
