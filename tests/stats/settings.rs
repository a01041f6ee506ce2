use super::{histogram_sink, scalar_sink};
use tower_outbound_stats::{
    CountAggregator, HistogramAggregator, StatsError, StatsSettings, MAX_HISTOGRAM_INTERVAL_SECS,
    MAX_INTERVAL_SECS,
};

#[test]
fn scalar_intervals_run_up_to_a_day() {
    let (_, sink) = scalar_sink();
    assert!(CountAggregator::count(StatsSettings::new("c", MAX_INTERVAL_SECS), sink).is_ok());

    let (_, sink) = scalar_sink();
    let err =
        CountAggregator::count(StatsSettings::new("c", MAX_INTERVAL_SECS + 1), sink).unwrap_err();
    match err {
        StatsError::InvalidInterval {
            metric,
            interval_secs,
            min_secs,
            max_secs,
        } => {
            assert_eq!(metric, "c");
            assert_eq!(interval_secs, 86_401);
            assert_eq!(min_secs, 1);
            assert_eq!(max_secs, 86_400);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn histogram_intervals_are_capped_at_a_minute() {
    let (_, sink) = histogram_sink();
    assert!(
        HistogramAggregator::histogram(StatsSettings::new("h", MAX_HISTOGRAM_INTERVAL_SECS), sink)
            .is_ok()
    );

    let (_, sink) = histogram_sink();
    assert!(matches!(
        HistogramAggregator::histogram(StatsSettings::new("h", 61), sink),
        Err(StatsError::InvalidInterval { max_secs: 60, .. })
    ));
}

#[test]
fn zero_interval_is_rejected() {
    let (_, sink) = scalar_sink();
    assert!(matches!(
        CountAggregator::count(StatsSettings::new("c", 0), sink),
        Err(StatsError::InvalidInterval { .. })
    ));
}
