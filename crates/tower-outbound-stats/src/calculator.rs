//! Order statistics over `f64` samples.

use crate::error::StatsError;

pub fn sum(sequence: &[f64]) -> Result<f64, StatsError> {
    if sequence.is_empty() {
        return Err(StatsError::EmptySequence);
    }
    Ok(sequence.iter().sum())
}

pub fn average(sequence: &[f64]) -> Result<f64, StatsError> {
    Ok(sum(sequence)? / sequence.len() as f64)
}

pub fn last(sequence: &[f64]) -> Result<f64, StatsError> {
    sequence.last().copied().ok_or(StatsError::EmptySequence)
}

/// Percentile `p` of an ascending `sequence`.
///
/// Uses the rank `r = (N - 1) * p + 1`. Rank 1 is the first element,
/// rank `N` the last, and any other rank interpolates linearly between
/// the two order statistics around it, so the median of `1..=100` is
/// `50.5`.
///
/// The caller is responsible for sorting; an unsorted input gives a
/// meaningless (but bounded) answer.
pub fn percentile(sequence: &[f64], p: f64) -> Result<f64, StatsError> {
    let n = sequence.len();
    if n == 0 {
        return Err(StatsError::EmptySequence);
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(StatsError::InvalidPercentile { percentile: p });
    }

    let rank = (n - 1) as f64 * p + 1.0;
    if rank <= 1.0 {
        return Ok(sequence[0]);
    }
    if rank >= n as f64 {
        return Ok(sequence[n - 1]);
    }

    let k = rank.trunc() as usize;
    let fraction = rank - k as f64;
    let lower = sequence[k - 1];
    let upper = sequence[k];
    Ok(lower + fraction * (upper - lower))
}
