use std::cmp::Ordering;

/// Percentile with linear interpolation between closest ranks, `q` in `[0, 100]`.
pub(crate) fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Flags every row whose normality score falls strictly below `offset` (1 = outlier).
pub(crate) fn label_below(normality: &[f64], offset: f64) -> Vec<i32> {
    normality
        .iter()
        .map(|&score| if score < offset { 1 } else { 0 })
        .collect()
}
