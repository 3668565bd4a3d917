/// Multiplier applied to the field id in the composite group key.
pub const FCQFID_FIELD_FACTOR: u64 = 10_000;

/// Multiplier applied to the chip id in the composite group key.
pub const FCQFID_CHIP_FACTOR: u64 = 100;

/// Multiplier applied to the quadrant id in the composite group key.
pub const FCQFID_QUADRANT_FACTOR: u64 = 10;

/// Largest field id representable in the composite key's field slot.
pub const MAX_FIELD_ID: u32 = 99_999;

/// Largest chip (CCD) id that fits the two-digit chip slot.
pub const MAX_CHIP_ID: u8 = 99;

/// Largest quadrant id that fits the one-digit quadrant slot.
pub const MAX_QUADRANT_ID: u8 = 9;

/// Largest filter id that fits the one-digit filter slot.
pub const MAX_FILTER_ID: u8 = 9;

/// Field ids at or above this value belong to the secondary observation grid.
pub const SECONDARY_GRID_FIELD_START: u32 = 1_000;

/// Scale factor turning a median absolute deviation into a Gaussian sigma
/// estimate (1 / Phi^-1(3/4)).
pub const MAD_NORMAL_SCALE: f64 = 1.482_602_218_505_602;

/// Samples deviating from the candidate median by more than this many of
/// their own uncertainties are rejected from a baseline candidate set.
pub const OUTLIER_SIGMA_THRESHOLD: f64 = 5.0;

/// Inlier count at which a baseline side is accepted outright.
pub const BASELINE_PREFERRED_SAMPLES: usize = 25;

/// Inlier count above which the pre-peak side is accepted when the
/// post-peak side is not preferred.
pub const BASELINE_MIN_SAMPLES: usize = 10;

/// Minimum number of samples (and inliers) for a candidate set to yield a
/// weighted mean and reduced chi-square.
pub const MIN_CANDIDATE_SAMPLES: usize = 2;

/// Half-width (days) of the window around the peak used to find the
/// brightest magnitude for the decay-based fall time.
pub const DECAY_PEAK_HALF_WINDOW_DAYS: f64 = 10.0;

/// Magnitude at which the transient is considered faded below detection.
pub const DECAY_FADED_MAGNITUDE: f64 = 22.5;

/// Assumed radioactive (Co-56) fade rate in magnitudes per day.
pub const DECAY_RATE_MAG_PER_DAY: f64 = 0.009;

/// Fall time (days) used when no measurement lies near the peak.
pub const DECAY_FALLBACK_DAYS: f64 = 611.0;

/// Converts a flux ratio uncertainty into a magnitude uncertainty (2.5 / ln 10).
pub const MAG_ERR_FACTOR: f64 = 1.085_736_204_758_129_4;

/// Default rolling-median window (days) for the peak search.
pub const DEFAULT_PEAK_WINDOW_DAYS: f64 = 10.0;

/// Default peak signal-to-noise a group needs to contribute a peak time.
pub const DEFAULT_MIN_PEAK_SNR: f64 = 3.0;

/// Filter channel skipped during the peak search by default.
pub const DEFAULT_PEAK_EXCLUDED_FILTER: u8 = 3;

/// Filter channel skipped during baseline assignment by default.
pub const DEFAULT_BASELINE_EXCLUDED_FILTER: u8 = 4;

/// Standard deviation of local peak times (days) above which a scatter
/// warning is raised.
pub const DEFAULT_PEAK_SCATTER_WARNING_DAYS: f64 = 10.0;

/// Default days before peak excluded from the pre-peak baseline.
pub const DEFAULT_RISETIME_DAYS: f64 = 100.0;

/// Default days after peak excluded from the post-peak baseline.
pub const DEFAULT_FALLTIME_DAYS: f64 = 365.0;

/// Default minimum rows per (field, filter) combination.
pub const DEFAULT_MIN_SAMPLES_PER_GROUP: usize = 10;

/// Default maximum |log10(median_zp / zp)| for a row to survive.
pub const DEFAULT_MAX_ZEROPOINT_DEVIATION: f64 = 0.5;

/// Default days a reference image must end before the local peak.
pub const DEFAULT_REFERENCE_MARGIN_DAYS: f64 = 50.0;

/// Default common zeropoint fluxes are normalized to before statistics.
pub const DEFAULT_PIVOT_ZEROPOINT: f64 = 28.0;
