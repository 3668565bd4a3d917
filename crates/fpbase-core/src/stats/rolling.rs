use super::median::median_in_place;

/// Centered rolling median over an irregular time axis.
///
/// For each sample `i` the window is the half-open interval
/// `(times[i] - window/2, times[i] + window/2]`, so every window contains at
/// least sample `i` itself. `times` must be sorted ascending and have the same
/// length as `values`.
pub fn rolling_median_centered(times: &[f64], values: &[f64], window: f64) -> Vec<f64> {
    debug_assert_eq!(times.len(), values.len());
    let half = window / 2.0;
    let mut scratch = Vec::with_capacity(values.len());

    times
        .iter()
        .map(|&t| {
            let lo = times.partition_point(|&x| x <= t - half);
            let hi = times.partition_point(|&x| x <= t + half);
            scratch.clear();
            scratch.extend_from_slice(&values[lo..hi]);
            median_in_place(&mut scratch)
        })
        .collect()
}

/// Index of the first maximum, or `None` for an empty slice.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
