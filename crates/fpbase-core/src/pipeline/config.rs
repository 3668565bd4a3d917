use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BASELINE_EXCLUDED_FILTER, DEFAULT_FALLTIME_DAYS, DEFAULT_MAX_ZEROPOINT_DEVIATION,
    DEFAULT_MIN_PEAK_SNR, DEFAULT_MIN_SAMPLES_PER_GROUP, DEFAULT_PEAK_EXCLUDED_FILTER,
    DEFAULT_PEAK_SCATTER_WARNING_DAYS, DEFAULT_PEAK_WINDOW_DAYS, DEFAULT_PIVOT_ZEROPOINT,
    DEFAULT_REFERENCE_MARGIN_DAYS, DEFAULT_RISETIME_DAYS,
};
use crate::error::{BaselineError, Result};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub peak: PeakConfig,
    #[serde(default)]
    pub window: TransientWindowConfig,
    #[serde(default)]
    pub reference: ReferenceGateConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Reject configurations that would silently produce meaningless output.
    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        non_negative("quality.max_zeropoint_deviation", q.max_zeropoint_deviation)?;
        if q.max_zeropoint_deviation == 0.0 {
            return Err(BaselineError::InvalidConfig(
                "quality.max_zeropoint_deviation must be greater than zero".into(),
            ));
        }

        let p = &self.peak;
        non_negative("peak.window_days", p.window_days)?;
        if p.window_days == 0.0 {
            return Err(BaselineError::InvalidConfig(
                "peak.window_days must be greater than zero".into(),
            ));
        }
        non_negative("peak.min_peak_snr", p.min_peak_snr)?;
        non_negative("peak.scatter_warning_days", p.scatter_warning_days)?;

        non_negative("window.risetime_days", self.window.risetime_days)?;
        if let FallTime::Fixed(days) = self.window.falltime {
            non_negative("window.falltime", days)?;
        }

        if let Some(margin) = self.reference.margin_days {
            non_negative("reference.margin_days", margin)?;
        }

        if !self.output.pivot_zeropoint.is_finite() || self.output.pivot_zeropoint <= 0.0 {
            return Err(BaselineError::InvalidConfig(format!(
                "output.pivot_zeropoint must be positive, got {}",
                self.output.pivot_zeropoint
            )));
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(BaselineError::InvalidConfig(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Drop rows whose pass flag is not set.
    pub require_pass_flag: bool,
    /// Drop rows from the secondary observation grid.
    pub primary_grid_only: bool,
    /// Minimum rows per (field, filter) combination.
    pub min_samples_per_group: usize,
    /// Maximum |log10(median_zp / zp)| for a row to survive.
    pub max_zeropoint_deviation: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            require_pass_flag: true,
            primary_grid_only: false,
            min_samples_per_group: DEFAULT_MIN_SAMPLES_PER_GROUP,
            max_zeropoint_deviation: DEFAULT_MAX_ZEROPOINT_DEVIATION,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Width (days) of the centered rolling-median window.
    pub window_days: f64,
    /// A group's peak SNR must exceed this to contribute a peak time.
    pub min_peak_snr: f64,
    /// Filter channels skipped during the peak search.
    ///
    /// The default (channel 3) is kept for compatibility with existing
    /// FPbot reductions; its rationale awaits domain review.
    pub excluded_filters: Vec<u8>,
    /// Only primary-grid groups contribute peak times.
    pub require_primary_grid: bool,
    /// Standard deviation of local peak times above which a warning is raised.
    pub scatter_warning_days: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_PEAK_WINDOW_DAYS,
            min_peak_snr: DEFAULT_MIN_PEAK_SNR,
            excluded_filters: vec![DEFAULT_PEAK_EXCLUDED_FILTER],
            require_primary_grid: true,
            scatter_warning_days: DEFAULT_PEAK_SCATTER_WARNING_DAYS,
        }
    }
}

/// How far after the peak the transient is assumed to have faded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum FallTime {
    /// Fixed number of days after peak.
    Fixed(f64),
    /// Estimated from the peak magnitude assuming Co-56 decay.
    Decay,
}

impl Default for FallTime {
    fn default() -> Self {
        Self::Fixed(DEFAULT_FALLTIME_DAYS)
    }
}

impl std::fmt::Display for FallTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(days) => write!(f, "Fixed ({days} d)"),
            Self::Decay => write!(f, "Co-56 decay"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientWindowConfig {
    /// Days before peak excluded from the pre-peak baseline.
    pub risetime_days: f64,
    pub falltime: FallTime,
}

impl Default for TransientWindowConfig {
    fn default() -> Self {
        Self {
            risetime_days: DEFAULT_RISETIME_DAYS,
            falltime: FallTime::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceGateConfig {
    /// Days the reference image must end before a group's local peak.
    /// `None` or `0` disables the gate.
    pub margin_days: Option<f64>,
}

impl ReferenceGateConfig {
    /// The active margin, or `None` when the gate is disabled.
    pub fn active_margin(&self) -> Option<f64> {
        self.margin_days.filter(|&m| m > 0.0)
    }
}

impl Default for ReferenceGateConfig {
    fn default() -> Self {
        Self {
            margin_days: Some(DEFAULT_REFERENCE_MARGIN_DAYS),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Filter channels that never receive a baseline.
    ///
    /// The default (channel 4) is kept for compatibility with existing
    /// FPbot reductions; its rationale awaits domain review.
    pub excluded_filters: Vec<u8>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            excluded_filters: vec![DEFAULT_BASELINE_EXCLUDED_FILTER],
        }
    }
}

/// Which rows end up in the corrected output table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InclusionPolicy {
    /// Rows of groups with a usable baseline.
    #[default]
    Corrected,
    /// Every row that survived filtering; uncorrected rows carry no
    /// corrected values.
    KeepAll,
    /// Corrected rows inside the transient window only.
    TransientWindowOnly,
}

impl std::fmt::Display for InclusionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrected => write!(f, "Corrected"),
            Self::KeepAll => write!(f, "Keep All"),
            Self::TransientWindowOnly => write!(f, "Transient Window Only"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub inclusion: InclusionPolicy,
    /// Rescale fluxes to `pivot_zeropoint` before computing statistics.
    pub normalize_zeropoint: bool,
    pub pivot_zeropoint: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            inclusion: InclusionPolicy::default(),
            normalize_zeropoint: true,
            pivot_zeropoint: DEFAULT_PIVOT_ZEROPOINT,
        }
    }
}
