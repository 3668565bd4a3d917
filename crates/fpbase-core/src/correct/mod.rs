pub mod zeropoint;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::baseline::{BaselineSide, GroupBaseline, TransientWindow};
use crate::consts::MAG_ERR_FACTOR;
use crate::grouping::{GroupKey, GroupMap};
use crate::measurement::Measurement;
use crate::pipeline::config::InclusionPolicy;

pub use zeropoint::{normalize_zeropoints, restore_native_scale, zeropoint_scale};

/// One output row: the input measurement plus its baseline correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrectedMeasurement {
    pub measurement: Measurement,
    pub group: GroupKey,
    pub in_transient_window: bool,
    pub side: BaselineSide,
    pub baseline: Option<f64>,
    pub baseline_err_mult: Option<f64>,
    pub baseline_samples: usize,
    pub corrected_flux: Option<f64>,
    pub corrected_flux_err: Option<f64>,
}

impl CorrectedMeasurement {
    pub fn is_corrected(&self) -> bool {
        self.side != BaselineSide::None
    }

    /// `(magnitude, magnitude_err)` of the corrected flux, when positive.
    pub fn magnitude(&self) -> Option<(f64, f64)> {
        let flux = self.corrected_flux.filter(|&f| f > 0.0)?;
        let err = self.corrected_flux_err?;
        Some((
            self.measurement.zeropoint - 2.5 * flux.log10(),
            MAG_ERR_FACTOR * err / flux,
        ))
    }
}

/// Subtract each group's baseline and inflate its uncertainties.
///
/// Rows are returned sorted by (time, row). Which rows are kept depends on
/// `policy`; groups missing from `baselines` count as uncorrected.
pub fn correct_fluxes(
    groups: &GroupMap,
    baselines: &BTreeMap<GroupKey, GroupBaseline>,
    window: Option<&TransientWindow>,
    policy: InclusionPolicy,
) -> Vec<CorrectedMeasurement> {
    let mut rows = Vec::new();
    for (key, members) in groups {
        let chosen = baselines.get(key).and_then(|b| b.chosen);
        for m in members {
            let in_window = window.is_some_and(|w| w.contains(m.mjd));
            let keep = match policy {
                InclusionPolicy::Corrected => chosen.is_some(),
                InclusionPolicy::KeepAll => true,
                InclusionPolicy::TransientWindowOnly => chosen.is_some() && in_window,
            };
            if !keep {
                continue;
            }
            rows.push(match chosen {
                Some(b) => CorrectedMeasurement {
                    measurement: m.clone(),
                    group: *key,
                    in_transient_window: in_window,
                    side: b.side,
                    baseline: Some(b.value),
                    baseline_err_mult: Some(b.error_multiplier),
                    baseline_samples: b.samples,
                    corrected_flux: Some(m.flux - b.value),
                    corrected_flux_err: Some(m.flux_err * b.error_multiplier),
                },
                None => CorrectedMeasurement {
                    measurement: m.clone(),
                    group: *key,
                    in_transient_window: in_window,
                    side: BaselineSide::None,
                    baseline: None,
                    baseline_err_mult: None,
                    baseline_samples: 0,
                    corrected_flux: None,
                    corrected_flux_err: None,
                },
            });
        }
    }

    rows.sort_by(|a, b| {
        a.measurement
            .mjd
            .total_cmp(&b.measurement.mjd)
            .then(a.measurement.row.cmp(&b.measurement.row))
    });
    info!(rows = rows.len(), policy = %policy, "Fluxes corrected");
    rows
}

