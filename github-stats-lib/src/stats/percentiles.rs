use serde::Serialize;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Lead-time percentiles for one repository, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeadTimePercentiles {
    pub p99_hours: f64,
    pub p95_hours: f64,
    pub p90_hours: f64,
    pub p75_hours: f64,
    pub p50_hours: f64,
}

/// Whether a lead-time sample takes part in the summary
#[must_use]
pub const fn is_valid_sample(seconds: f64) -> bool {
    seconds.is_finite() && seconds >= 0.0
}

/// Summarize lead-time samples given in seconds.
///
/// Returns `None` when there is nothing to summarize. Non-finite and negative
/// samples are ignored.
#[must_use]
pub fn summarize(samples_seconds: &[f64]) -> Option<LeadTimePercentiles> {
    let mut seconds: Vec<f64> = samples_seconds
        .iter()
        .copied()
        .filter(|&s| is_valid_sample(s))
        .collect();

    if seconds.is_empty() {
        return None;
    }

    seconds.sort_by(f64::total_cmp);

    Some(LeadTimePercentiles {
        p99_hours: percentile(&seconds, 99.0) / SECONDS_PER_HOUR,
        p95_hours: percentile(&seconds, 95.0) / SECONDS_PER_HOUR,
        p90_hours: percentile(&seconds, 90.0) / SECONDS_PER_HOUR,
        p75_hours: percentile(&seconds, 75.0) / SECONDS_PER_HOUR,
        p50_hours: percentile(&seconds, 50.0) / SECONDS_PER_HOUR,
    })
}

/// Percentile of already sorted data, linearly interpolated between the two
/// closest ranks (rank = p / 100 * (n - 1)).
fn percentile(sorted_data: &[f64], percentile: f64) -> f64 {
    let Some(last_index) = sorted_data.len().checked_sub(1) else {
        return 0.0;
    };

    #[expect(clippy::cast_precision_loss, reason = "index fits in f64")]
    let rank = (percentile / 100.0 * last_index as f64).clamp(0.0, last_index as f64);

    #[expect(clippy::cast_possible_truncation, reason = "rank is clamped to a valid index")]
    #[expect(clippy::cast_sign_loss, reason = "rank is clamped to non-negative range")]
    let (lower, upper) = (rank.floor() as usize, rank.ceil() as usize);

    match (sorted_data.get(lower), sorted_data.get(upper)) {
        #[expect(clippy::cast_precision_loss, reason = "index fits in f64")]
        (Some(&low), Some(&high)) => low + (rank - lower as f64) * (high - low),
        _ => 0.0,
    }
}
