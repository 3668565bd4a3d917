use serde::{Deserialize, Serialize};

use crate::error::{BaselineError, Result};
use crate::grouping::GroupKey;

/// A single forced-photometry sample.
///
/// Flux values are PSF-fit amplitudes in the units implied by `zeropoint`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Position of the row in the input table.
    pub row: usize,
    /// Observation time (MJD).
    pub mjd: f64,
    pub flux: f64,
    pub flux_err: f64,
    /// Photometric zeropoint (mag).
    pub zeropoint: f64,
    pub field_id: u32,
    pub chip_id: u32,
    pub quadrant_id: u32,
    pub filter_id: u32,
    /// Quality pass flag from the photometry pipeline.
    pub pass: bool,
}

impl Measurement {
    pub fn group_key(&self) -> Result<GroupKey> {
        GroupKey::new(self.field_id, self.chip_id, self.quadrant_id, self.filter_id)
    }

    /// Signal-to-noise "pull" of this sample: flux over its uncertainty.
    pub fn pull(&self) -> f64 {
        self.flux / self.flux_err
    }

    /// Apparent magnitude, or `None` when the flux is not positive.
    pub fn magnitude(&self) -> Option<f64> {
        if self.flux > 0.0 {
            Some(self.zeropoint - 2.5 * self.flux.log10())
        } else {
            None
        }
    }

    /// Check the numeric fields and the group-key digit budgets.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| BaselineError::InvalidMeasurement {
            row: self.row,
            reason: reason.to_string(),
        };
        if !self.mjd.is_finite() {
            return Err(invalid("non-finite time"));
        }
        if !self.flux.is_finite() {
            return Err(invalid("non-finite flux"));
        }
        if !(self.flux_err.is_finite() && self.flux_err > 0.0) {
            return Err(invalid("flux uncertainty must be positive and finite"));
        }
        if !(self.zeropoint.is_finite() && self.zeropoint > 0.0) {
            return Err(invalid("zeropoint must be positive and finite"));
        }
        self.group_key()?;
        Ok(())
    }
}

/// Validate every row of a table, failing on the first bad row.
pub fn validate_table(measurements: &[Measurement]) -> Result<()> {
    measurements.iter().try_for_each(Measurement::validate)
}

/// Assign consecutive `row` indices in table order.
pub fn number_rows(measurements: &mut [Measurement]) {
    for (i, m) in measurements.iter_mut().enumerate() {
        m.row = i;
    }
}
