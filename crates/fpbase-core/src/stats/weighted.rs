use serde::{Deserialize, Serialize};

use crate::consts::{MIN_CANDIDATE_SAMPLES, OUTLIER_SIGMA_THRESHOLD};

use super::median::median;

/// Outlier-rejected, inverse-variance weighted statistics of one sample set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClippedStats {
    /// Weighted mean flux of the inliers (weights 1/err^2).
    pub weighted_mean: f64,
    /// Sum of squared normalized inlier residuals over (inliers - 1).
    pub reduced_chi2: f64,
    pub inliers: usize,
    pub rejected: usize,
}

impl ClippedStats {
    /// Error inflation implied by the excess scatter, never below 1.
    pub fn error_multiplier(&self) -> f64 {
        self.reduced_chi2.sqrt().max(1.0)
    }
}

/// Reject outliers around the median, then compute the weighted mean and
/// reduced chi-square of the survivors.
///
/// A sample is an outlier when `|flux - median| / err` exceeds
/// `OUTLIER_SIGMA_THRESHOLD`. Returns `None` when fewer than two samples are
/// given or fewer than two survive.
pub fn clipped_weighted_mean(flux: &[f64], err: &[f64]) -> Option<ClippedStats> {
    debug_assert_eq!(flux.len(), err.len());
    if flux.len() < MIN_CANDIDATE_SAMPLES {
        return None;
    }

    let center = median(flux)?;
    let mask: Vec<bool> = flux
        .iter()
        .zip(err)
        .map(|(f, e)| ((f - center) / e).abs() <= OUTLIER_SIGMA_THRESHOLD)
        .collect();
    let inliers = mask.iter().filter(|&&keep| keep).count();
    if inliers < MIN_CANDIDATE_SAMPLES {
        return None;
    }

    let mut weighted_sum = 0.0f64;
    let mut weight_total = 0.0f64;
    for i in 0..flux.len() {
        if mask[i] {
            let w = 1.0 / (err[i] * err[i]);
            weighted_sum += w * flux[i];
            weight_total += w;
        }
    }
    let weighted_mean = weighted_sum / weight_total;

    let mut chi_sum = 0.0f64;
    for i in 0..flux.len() {
        if mask[i] {
            let r = (flux[i] - weighted_mean) / err[i];
            chi_sum += r * r;
        }
    }

    Some(ClippedStats {
        weighted_mean,
        reduced_chi2: chi_sum / (inliers - 1) as f64,
        inliers,
        rejected: flux.len() - inliers,
    })
}
