use crate::consts::MAD_NORMAL_SCALE;

/// Median of `values`, or `None` for an empty slice.
///
/// Uses `select_nth_unstable` on a scratch copy for O(n) selection without a
/// full sort. Even-length input averages the two central values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut scratch = values.to_vec();
    Some(median_in_place(&mut scratch))
}

/// Median of a non-empty scratch buffer; the buffer is reordered.
pub(crate) fn median_in_place(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 1 {
        values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
    } else {
        let mid = n / 2;
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        // Everything left of `mid` is now <= values[mid]; its maximum is the
        // lower central value.
        values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// Median absolute deviation scaled to a Gaussian sigma.
pub fn mad_normal(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    Some(median_in_place(&mut deviations) * MAD_NORMAL_SCALE)
}
