#[allow(dead_code)]
mod common;

use std::collections::BTreeSet;

use fpbase_core::pipeline::config::QualityConfig;
use fpbase_core::quality::{
    apply_quality_filters, filter_pass_flag, filter_sparse_field_bands,
    filter_zeropoint_outliers, restrict_primary_grid,
};

use common::{flat_series, sample, sample_on};

// ---------------------------------------------------------------------------
// Individual filters
// ---------------------------------------------------------------------------

#[test]
fn test_pass_flag_filter() {
    let mut rows = flat_series(1, 58_000.0, 4, 1.0, 0.0, 1.0);
    rows[1].pass = false;
    let kept = filter_pass_flag(rows);
    assert_eq!(kept.len(), 3);
    assert!(kept.iter().all(|m| m.pass));
}

#[test]
fn test_primary_grid_restriction() {
    let rows = vec![
        sample_on(999, 1, 1, 1, 58_000.0, 1.0, 1.0),
        sample_on(1000, 1, 1, 1, 58_000.0, 1.0, 1.0),
        sample_on(1500, 1, 1, 1, 58_000.0, 1.0, 1.0),
    ];
    let kept = restrict_primary_grid(rows);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].field_id, 999);
}

#[test]
fn test_sparse_field_band_counts_field_filter_pairs() {
    // 6 rows of field 500 in filter 1 spread over two chips, plus 4 rows in
    // filter 2. With a minimum of 5 only the filter-1 rows survive.
    let mut rows = Vec::new();
    for i in 0..3 {
        rows.push(sample_on(500, 1, 1, 1, 58_000.0 + i as f64, 1.0, 1.0));
        rows.push(sample_on(500, 2, 1, 1, 58_000.0 + i as f64, 1.0, 1.0));
    }
    for i in 0..4 {
        rows.push(sample_on(500, 1, 1, 2, 58_000.0 + i as f64, 1.0, 1.0));
    }
    let kept = filter_sparse_field_bands(rows, 5);
    assert_eq!(kept.len(), 6);
    assert!(kept.iter().all(|m| m.filter_id == 1));
}

#[test]
fn test_sparse_field_band_does_not_mix_field_and_filter() {
    // (field 501, filter 1) and (field 500, filter 2) have equal sums of
    // field and filter but are distinct combinations.
    let mut rows = Vec::new();
    for i in 0..3 {
        rows.push(sample_on(501, 1, 1, 1, 58_000.0 + i as f64, 1.0, 1.0));
        rows.push(sample_on(500, 1, 1, 2, 58_000.0 + i as f64, 1.0, 1.0));
    }
    assert!(filter_sparse_field_bands(rows, 4).is_empty());
}

#[test]
fn test_zeropoint_outlier_filter() {
    let mut rows = flat_series(1, 58_000.0, 5, 1.0, 0.0, 1.0);
    // |log10(28 / 2)| ~ 1.15 is far above 0.5
    rows[2].zeropoint = 2.0;
    let kept = filter_zeropoint_outliers(rows, 0.5);
    assert_eq!(kept.len(), 4);
    assert!(kept.iter().all(|m| m.zeropoint == 28.0));
}

#[test]
fn test_zeropoint_filter_is_strict() {
    // A deviation exactly at the threshold is removed.
    let mut rows = vec![
        sample(1, 58_000.0, 1.0, 1.0),
        sample(1, 58_001.0, 1.0, 1.0),
        sample(1, 58_002.0, 1.0, 1.0),
    ];
    rows[0].zeropoint = 10.0;
    rows[1].zeropoint = 10.0;
    rows[2].zeropoint = 1.0;
    let kept = filter_zeropoint_outliers(rows, 1.0);
    assert_eq!(kept.len(), 2);
}

#[test]
fn test_zeropoint_filter_empty_input() {
    assert!(filter_zeropoint_outliers(Vec::new(), 0.5).is_empty());
}

// ---------------------------------------------------------------------------
// Combined filter chain
// ---------------------------------------------------------------------------

#[test]
fn test_apply_quality_filters_report() {
    let mut rows = flat_series(1, 58_000.0, 13, 1.0, 0.0, 1.0);
    rows[0].pass = false;
    rows[1].pass = false;
    rows.extend(flat_series(2, 58_000.0, 5, 1.0, 0.0, 1.0));
    rows[5].zeropoint = 5.0;

    let (kept, report) = apply_quality_filters(rows, &QualityConfig::default());
    assert_eq!(report.input_rows, 18);
    assert_eq!(report.failed_pass_flag, 2);
    assert_eq!(report.secondary_grid, 0);
    assert_eq!(report.zeropoint_outliers, 1);
    // filter 1 keeps exactly 10 rows; filter 2 has only 5
    assert_eq!(report.sparse_field_band, 5);
    assert_eq!(report.output_rows, 10);
    assert_eq!(kept.len(), 10);
    assert!(kept.iter().all(|m| m.filter_id == 1 && m.zeropoint == 28.0));
}

#[test]
fn test_sample_count_is_taken_after_zeropoint_cut() {
    // 10 rows meet the minimum only until the zeropoint cut removes one.
    let mut rows = flat_series(1, 58_000.0, 10, 1.0, 0.0, 1.0);
    rows[4].zeropoint = 2.0;

    let (kept, report) = apply_quality_filters(rows, &QualityConfig::default());
    assert!(kept.is_empty());
    assert_eq!(report.zeropoint_outliers, 1);
    assert_eq!(report.sparse_field_band, 9);
    assert_eq!(report.output_rows, 0);
}

#[test]
fn test_pass_flag_can_be_disabled() {
    let mut rows = flat_series(1, 58_000.0, 10, 1.0, 0.0, 1.0);
    rows[0].pass = false;
    let config = QualityConfig {
        require_pass_flag: false,
        ..Default::default()
    };
    let (kept, report) = apply_quality_filters(rows, &config);
    assert_eq!(kept.len(), 10);
    assert_eq!(report.failed_pass_flag, 0);
}

#[test]
fn test_raising_min_samples_never_grows_survivors() {
    let mut rows = Vec::new();
    for (filter, n) in [(1u32, 8usize), (2, 15), (3, 30)] {
        rows.extend(flat_series(filter, 58_000.0, n, 1.0, 0.0, 1.0));
    }

    let mut previous = usize::MAX;
    for min_samples in [0, 5, 10, 20, 40] {
        let config = QualityConfig {
            min_samples_per_group: min_samples,
            ..Default::default()
        };
        let (kept, _) = apply_quality_filters(rows.clone(), &config);
        assert!(kept.len() <= previous);
        previous = kept.len();
    }
    assert_eq!(previous, 0);
}

#[test]
fn test_raising_min_samples_with_mixed_zeropoints() {
    // Field 100 sits an order of magnitude off the table's zeropoint median.
    // Its rows must stay out however the count threshold moves.
    let mut rows = Vec::new();
    for (field, n, zeropoint) in [(100u32, 12usize, 3.0), (200, 10, 30.0), (300, 11, 30.0)] {
        for i in 0..n {
            let mut m = sample_on(field, 1, 1, 1, 58_000.0 + i as f64, 1.0, 1.0);
            m.zeropoint = zeropoint;
            rows.push(m);
        }
    }

    let survivors = |min_samples| {
        let config = QualityConfig {
            min_samples_per_group: min_samples,
            ..Default::default()
        };
        let (kept, _) = apply_quality_filters(rows.clone(), &config);
        kept.iter().map(|m| m.field_id).collect::<BTreeSet<_>>()
    };

    assert_eq!(survivors(10), BTreeSet::from([200, 300]));
    assert_eq!(survivors(11), BTreeSet::from([300]));
    assert!(survivors(12).is_empty());

    let mut previous = survivors(0);
    for min_samples in 1..=13 {
        let current = survivors(min_samples);
        assert!(current.is_subset(&previous), "min_samples {min_samples}");
        previous = current;
    }
}
