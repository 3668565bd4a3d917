use super::CorrectedMeasurement;
use crate::measurement::Measurement;

/// Factor converting a flux at `zeropoint` to the same flux at `pivot`.
pub fn zeropoint_scale(zeropoint: f64, pivot: f64) -> f64 {
    10f64.powf((pivot - zeropoint) / 2.5)
}

/// Rescale flux and uncertainty of every row to a common `pivot` zeropoint.
pub fn normalize_zeropoints(measurements: Vec<Measurement>, pivot: f64) -> Vec<Measurement> {
    measurements
        .into_iter()
        .map(|mut m| {
            let scale = zeropoint_scale(m.zeropoint, pivot);
            m.flux *= scale;
            m.flux_err *= scale;
            m.zeropoint = pivot;
            m
        })
        .collect()
}

/// Convert corrected rows computed at `pivot` back to each row's native
/// zeropoint.
///
/// `originals` is the input table indexed by `Measurement::row`; rows whose
/// original cannot be found are left untouched.
pub fn restore_native_scale(
    rows: Vec<CorrectedMeasurement>,
    originals: &[Measurement],
    pivot: f64,
) -> Vec<CorrectedMeasurement> {
    rows.into_iter()
        .map(|mut row| {
            let Some(original) = originals.get(row.measurement.row) else {
                return row;
            };
            let scale = zeropoint_scale(original.zeropoint, pivot);
            row.baseline = row.baseline.map(|b| b / scale);
            row.corrected_flux = row.corrected_flux.map(|f| f / scale);
            row.corrected_flux_err = row.corrected_flux_err.map(|e| e / scale);
            row.measurement = original.clone();
            row
        })
        .collect()
}
