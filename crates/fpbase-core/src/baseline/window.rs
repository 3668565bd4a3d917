use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DECAY_FADED_MAGNITUDE, DECAY_FALLBACK_DAYS, DECAY_PEAK_HALF_WINDOW_DAYS,
    DECAY_RATE_MAG_PER_DAY,
};
use crate::measurement::Measurement;
use crate::pipeline::config::{FallTime, TransientWindowConfig};

/// Time span (MJD) during which transient light is assumed present.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransientWindow {
    pub peak: f64,
    /// Start of the rise; earlier samples are pre-peak baseline candidates.
    pub rise: f64,
    /// End of the fade; later samples are post-peak baseline candidates.
    pub fall: f64,
}

impl TransientWindow {
    /// Closed interval `[rise, fall]`.
    pub fn contains(&self, mjd: f64) -> bool {
        mjd >= self.rise && mjd <= self.fall
    }

    pub fn is_before_rise(&self, mjd: f64) -> bool {
        mjd < self.rise
    }

    pub fn is_after_fall(&self, mjd: f64) -> bool {
        mjd > self.fall
    }
}

/// Build the transient window around `peak`.
///
/// `measurements` are all surviving samples of the run; they are only
/// consulted for the decay-based fall time.
pub fn derive_window(
    peak: f64,
    config: &TransientWindowConfig,
    measurements: &[Measurement],
) -> TransientWindow {
    let falltime = match config.falltime {
        FallTime::Fixed(days) => days,
        FallTime::Decay => decay_falltime(peak, measurements),
    };
    TransientWindow {
        peak,
        rise: peak - config.risetime_days,
        fall: peak + falltime,
    }
}

/// Days after peak for the transient to fade to the detection limit,
/// assuming Co-56 decay from the brightest magnitude seen within
/// `DECAY_PEAK_HALF_WINDOW_DAYS` of the peak.
///
/// Falls back to `DECAY_FALLBACK_DAYS` when no sample near the peak has a
/// positive flux.
///
/// Magnitudes pair each row's flux with the zeropoint of the same scale, so
/// they are physical magnitudes. FPbot pairs the native zeropoint with
/// pivot-normalized flux instead, so fall times here differ from its output
/// wherever the native zeropoint is not the pivot.
pub fn decay_falltime(peak: f64, measurements: &[Measurement]) -> f64 {
    let brightest = measurements
        .iter()
        .filter(|m| (m.mjd - peak).abs() < DECAY_PEAK_HALF_WINDOW_DAYS)
        .filter_map(Measurement::magnitude)
        .min_by(f64::total_cmp);

    match brightest {
        Some(mag) => {
            let days = (DECAY_FADED_MAGNITUDE - mag) / DECAY_RATE_MAG_PER_DAY;
            debug!(peak_mag = mag, falltime_days = days, "Decay-based fall time");
            days
        }
        None => {
            debug!("No positive flux near peak; using fallback fall time");
            DECAY_FALLBACK_DAYS
        }
    }
}
