use fpbase_core::grouping::GroupKey;
use fpbase_core::measurement::Measurement;

/// Field / chip / quadrant of the default synthetic group.
pub const FIELD: u32 = 500;
pub const CHIP: u32 = 5;
pub const QUADRANT: u32 = 2;

/// Peak epoch of the synthetic transient.
pub const PEAK_MJD: f64 = 58_600.0;

/// Deterministic pseudo-noise in `[-1, 1)`.
pub fn noise(i: usize) -> f64 {
    let x = ((i as f64 + 1.0) * 12.9898).sin() * 43_758.545_3;
    2.0 * (x - x.floor()) - 1.0
}

/// A passing sample on the default field/chip/quadrant at zeropoint 28.
pub fn sample(filter: u32, mjd: f64, flux: f64, flux_err: f64) -> Measurement {
    sample_on(FIELD, CHIP, QUADRANT, filter, mjd, flux, flux_err)
}

pub fn sample_on(
    field: u32,
    chip: u32,
    quadrant: u32,
    filter: u32,
    mjd: f64,
    flux: f64,
    flux_err: f64,
) -> Measurement {
    Measurement {
        row: 0,
        mjd,
        flux,
        flux_err,
        zeropoint: 28.0,
        field_id: field,
        chip_id: chip,
        quadrant_id: quadrant,
        filter_id: filter,
        pass: true,
    }
}

pub fn key(filter: u32) -> GroupKey {
    GroupKey::new(FIELD, CHIP, QUADRANT, filter).unwrap()
}

/// Flat noisy series of `n` samples starting at `start`, every `step` days.
pub fn flat_series(
    filter: u32,
    start: f64,
    n: usize,
    step: f64,
    level: f64,
    flux_err: f64,
) -> Vec<Measurement> {
    (0..n)
        .map(|i| {
            sample(
                filter,
                start + i as f64 * step,
                level + noise(i + 97 * filter as usize),
                flux_err,
            )
        })
        .collect()
}

/// Light curve with a Gaussian outburst of `amplitude` at `PEAK_MJD` on top
/// of a constant `level`, sampled every 6 days from MJD 58000 to 59500.
///
/// The 6-day cadence keeps one sample per 10-day rolling window, so the
/// smoothed pull peaks exactly on `PEAK_MJD`.
pub fn transient_series(filter: u32, level: f64, amplitude: f64) -> Vec<Measurement> {
    (0..=250)
        .map(|i| {
            let t = 58_000.0 + i as f64 * 6.0;
            let bump = amplitude * (-(t - PEAK_MJD).powi(2) / (2.0 * 15.0 * 15.0)).exp();
            sample(filter, t, level + bump + noise(i + 97 * filter as usize), 2.0)
        })
        .collect()
}

/// Two-band transient on the default field: g (filter 1) at level 50 and
/// r (filter 2) at level 30.
pub fn two_band_transient() -> Vec<Measurement> {
    let mut rows = transient_series(1, 50.0, 2000.0);
    rows.extend(transient_series(2, 30.0, 1500.0));
    rows
}
