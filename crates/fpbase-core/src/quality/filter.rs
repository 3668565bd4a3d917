use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::grouping::is_secondary_grid_field;
use crate::measurement::Measurement;
use crate::pipeline::config::QualityConfig;
use crate::stats::median;

/// Rows removed by each quality filter, in application order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub input_rows: usize,
    pub failed_pass_flag: usize,
    pub secondary_grid: usize,
    pub zeropoint_outliers: usize,
    pub sparse_field_band: usize,
    pub output_rows: usize,
}

/// Run every quality filter in order: pass flag, grid, zeropoint deviation,
/// per-(field, filter) sample count.
///
/// The zeropoint median is taken before any count decision, so it does not
/// depend on `min_samples_per_group`, and combinations are counted on the
/// rows that survive the zeropoint cut.
pub fn apply_quality_filters(
    measurements: Vec<Measurement>,
    config: &QualityConfig,
) -> (Vec<Measurement>, QualityReport) {
    let mut report = QualityReport {
        input_rows: measurements.len(),
        ..Default::default()
    };

    let mut rows = measurements;
    if config.require_pass_flag {
        let before = rows.len();
        rows = filter_pass_flag(rows);
        report.failed_pass_flag = before - rows.len();
    }

    if config.primary_grid_only {
        let before = rows.len();
        rows = restrict_primary_grid(rows);
        report.secondary_grid = before - rows.len();
    }

    let before = rows.len();
    rows = filter_zeropoint_outliers(rows, config.max_zeropoint_deviation);
    report.zeropoint_outliers = before - rows.len();

    let before = rows.len();
    rows = filter_sparse_field_bands(rows, config.min_samples_per_group);
    report.sparse_field_band = before - rows.len();

    report.output_rows = rows.len();
    info!(
        input = report.input_rows,
        pass_flag = report.failed_pass_flag,
        secondary_grid = report.secondary_grid,
        zeropoint = report.zeropoint_outliers,
        sparse = report.sparse_field_band,
        output = report.output_rows,
        "Quality filters applied"
    );
    (rows, report)
}

/// Keep rows whose pass flag is set.
pub fn filter_pass_flag(measurements: Vec<Measurement>) -> Vec<Measurement> {
    measurements.into_iter().filter(|m| m.pass).collect()
}

/// Drop rows whose field lies in the secondary observation grid.
pub fn restrict_primary_grid(measurements: Vec<Measurement>) -> Vec<Measurement> {
    measurements
        .into_iter()
        .filter(|m| !is_secondary_grid_field(m.field_id))
        .collect()
}

/// Drop every row of a (field, filter) combination with fewer than
/// `min_samples` rows.
pub fn filter_sparse_field_bands(
    measurements: Vec<Measurement>,
    min_samples: usize,
) -> Vec<Measurement> {
    let mut counts: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for m in &measurements {
        *counts.entry((m.field_id, m.filter_id)).or_default() += 1;
    }
    for (&(field, filter), &count) in &counts {
        if count < min_samples {
            debug!(field, filter, count, "Dropping sparse field/filter combination");
        }
    }
    measurements
        .into_iter()
        .filter(|m| counts[&(m.field_id, m.filter_id)] >= min_samples)
        .collect()
}

/// Drop rows whose zeropoint deviates from the table median by
/// `|log10(median / zp)| >= max_deviation`.
pub fn filter_zeropoint_outliers(
    measurements: Vec<Measurement>,
    max_deviation: f64,
) -> Vec<Measurement> {
    let zeropoints: Vec<f64> = measurements.iter().map(|m| m.zeropoint).collect();
    let Some(median_zp) = median(&zeropoints) else {
        return measurements;
    };
    measurements
        .into_iter()
        .filter(|m| (median_zp / m.zeropoint).log10().abs() < max_deviation)
        .collect()
}
