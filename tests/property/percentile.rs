//! Invariants tested:
//! - every percentile lies between the minimum and the maximum
//! - percentiles never decrease as `p` grows
//! - `p = 0` and `p = 1` are exactly the extremes
//! - `p` outside `[0, 1]` is rejected

use proptest::prelude::*;
use tower_outbound_stats::calculator::percentile;
use tower_outbound_stats::{HistogramRecord, StatsError};

/// Integer-valued samples keep interpolation free of rounding above the
/// upper neighbour.
fn sorted_samples() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1_000_000i32..=1_000_000, 1..200).prop_map(|values| {
        let mut samples: Vec<f64> = values.into_iter().map(f64::from).collect();
        samples.sort_unstable_by(f64::total_cmp);
        samples
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn percentiles_stay_within_the_samples(samples in sorted_samples(), p in 0.0f64..=1.0) {
        let value = percentile(&samples, p).unwrap();
        let min = samples[0];
        let max = samples[samples.len() - 1];
        prop_assert!(value >= min && value <= max, "{} outside [{}, {}]", value, min, max);
    }

    #[test]
    fn percentiles_are_monotone(samples in sorted_samples(), a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let at_low = percentile(&samples, low).unwrap();
        let at_high = percentile(&samples, high).unwrap();
        prop_assert!(at_low <= at_high + 1e-6, "p{} = {} > p{} = {}", low, at_low, high, at_high);
    }

    #[test]
    fn extremes_are_exact(samples in sorted_samples()) {
        prop_assert_eq!(percentile(&samples, 0.0).unwrap(), samples[0]);
        prop_assert_eq!(percentile(&samples, 1.0).unwrap(), samples[samples.len() - 1]);
    }

    #[test]
    fn out_of_range_percentiles_are_rejected(samples in sorted_samples(), excess in 1e-6f64..10.0) {
        let above = matches!(
            percentile(&samples, 1.0 + excess),
            Err(StatsError::InvalidPercentile { .. })
        );
        let below = matches!(
            percentile(&samples, -excess),
            Err(StatsError::InvalidPercentile { .. })
        );
        prop_assert!(above && below);
    }

    #[test]
    fn records_are_ordered_summaries(samples in sorted_samples()) {
        let record = HistogramRecord::from_sorted(&samples).unwrap();
        prop_assert_eq!(record.n, samples.len());
        prop_assert_eq!(record.p0, samples[0]);
        prop_assert_eq!(record.p100, samples[samples.len() - 1]);

        let ladder = [
            record.p0,
            record.p50,
            record.p90,
            record.p95,
            record.p99,
            record.p999,
            record.p9999,
            record.p100,
        ];
        for pair in ladder.windows(2) {
            prop_assert!(pair[0] <= pair[1] + 1e-6, "{:?}", ladder);
        }
        prop_assert!(record.avg >= record.p0 - 1e-6 && record.avg <= record.p100 + 1e-6);
    }
}
