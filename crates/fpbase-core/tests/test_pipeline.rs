#[allow(dead_code)]
mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use approx::assert_abs_diff_eq;

use fpbase_core::baseline::BaselineSide;
use fpbase_core::error::BaselineError;
use fpbase_core::io::diagnostics_io::write_diagnostics;
use fpbase_core::io::table::write_corrected;
use fpbase_core::measurement::Measurement;
use fpbase_core::pipeline::config::{InclusionPolicy, PipelineConfig};
use fpbase_core::pipeline::{
    run_pipeline, run_pipeline_reported, summarize_groups, PipelineStage, ProgressReporter,
};
use fpbase_core::reference::{NoReferenceEpochs, ReferenceEpochs, StaticReferenceEpochs};

use common::{flat_series, key, two_band_transient, PEAK_MJD};

fn run_default(rows: &[Measurement]) -> fpbase_core::pipeline::PipelineOutput {
    run_pipeline(rows, &PipelineConfig::default(), &NoReferenceEpochs).unwrap()
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

#[test]
fn test_two_band_transient_end_to_end() {
    let output = run_default(&two_band_transient());
    let diag = &output.diagnostics;

    assert_abs_diff_eq!(diag.peak_time().unwrap(), PEAK_MJD);
    let window = diag.transient_window.unwrap();
    assert_abs_diff_eq!(window.rise, PEAK_MJD - 100.0);
    assert_abs_diff_eq!(window.fall, PEAK_MJD + 365.0);

    assert_eq!(diag.side_counts(), (2, 0, 0));
    assert_eq!(output.rows.len(), 2 * 251);

    let g = &diag.groups[&key(1)];
    assert_eq!(g.samples, 251);
    assert_eq!(g.pre_inliers, 84);
    assert_eq!(g.post_inliers, 90);
    assert_eq!(g.side, BaselineSide::Pre);
    assert!(g.local_peak.unwrap().contributes);

    let baseline_g = output
        .rows
        .iter()
        .find(|r| r.group == key(1))
        .and_then(|r| r.baseline)
        .unwrap();
    let baseline_r = output
        .rows
        .iter()
        .find(|r| r.group == key(2))
        .and_then(|r| r.baseline)
        .unwrap();
    assert_abs_diff_eq!(baseline_g, 50.0, epsilon = 0.5);
    assert_abs_diff_eq!(baseline_r, 30.0, epsilon = 0.5);

    let at_peak = output
        .rows
        .iter()
        .find(|r| r.group == key(1) && r.measurement.mjd == PEAK_MJD)
        .unwrap();
    assert!(at_peak.in_transient_window);
    assert_abs_diff_eq!(at_peak.corrected_flux.unwrap(), 2000.0, epsilon = 2.0);
    assert!(at_peak.magnitude().is_some());
}

#[test]
fn test_every_multiplier_at_least_one() {
    let output = run_default(&two_band_transient());
    assert!(output
        .rows
        .iter()
        .all(|r| r.baseline_err_mult.is_some_and(|m| m >= 1.0)));
}

#[test]
fn test_rows_keep_input_positions() {
    let input = two_band_transient();
    let output = run_default(&input);
    for r in &output.rows {
        let original = &input[r.measurement.row];
        assert_eq!(original.mjd, r.measurement.mjd);
        assert_eq!(original.flux, r.measurement.flux);
    }
}

#[test]
fn test_run_is_idempotent() {
    let input = two_band_transient();
    let first = run_default(&input);
    let second = run_default(&input);
    assert_eq!(first, second);

    let mut table_a = Vec::new();
    let mut table_b = Vec::new();
    write_corrected(&mut table_a, &first.rows).unwrap();
    write_corrected(&mut table_b, &second.rows).unwrap();
    assert_eq!(table_a, table_b);

    let mut diag_a = Vec::new();
    let mut diag_b = Vec::new();
    write_diagnostics(&mut diag_a, &first.diagnostics).unwrap();
    write_diagnostics(&mut diag_b, &second.diagnostics).unwrap();
    assert_eq!(diag_a, diag_b);
}

#[test]
fn test_no_peak_uses_whole_group() {
    let rows = flat_series(1, 58_000.0, 40, 3.0, 0.0, 1.0);
    let output = run_default(&rows);

    assert!(output.diagnostics.peak.is_none());
    assert!(output.diagnostics.transient_window.is_none());
    assert_eq!(output.rows.len(), 40);
    assert!(output.rows.iter().all(|r| !r.in_transient_window));
    assert!(output.rows.iter().all(|r| r.side == BaselineSide::Pre));
}

#[test]
fn test_sparse_group_yields_no_rows_by_default() {
    let mut rows = two_band_transient();
    // 12 rows of a third band: survives the count filter but has no
    // usable baseline on either side of the window
    rows.extend(flat_series(5, PEAK_MJD - 5.0, 12, 1.0, 0.0, 1.0));
    let output = run_default(&rows);

    let g = &output.diagnostics.groups[&key(5)];
    assert_eq!(g.side, BaselineSide::None);
    assert!(output.rows.iter().all(|r| r.group != key(5)));

    let config = PipelineConfig {
        output: fpbase_core::pipeline::config::OutputConfig {
            inclusion: InclusionPolicy::KeepAll,
            ..Default::default()
        },
        ..Default::default()
    };
    let output = run_pipeline(&rows, &config, &NoReferenceEpochs).unwrap();
    let uncorrected: Vec<_> = output.rows.iter().filter(|r| r.group == key(5)).collect();
    assert_eq!(uncorrected.len(), 12);
    assert!(uncorrected.iter().all(|r| r.corrected_flux.is_none()));
}

#[test]
fn test_native_zeropoints_are_preserved() {
    let rows: Vec<Measurement> = two_band_transient()
        .into_iter()
        .map(|mut m| {
            // five magnitudes fainter zeropoint: fluxes are 100x smaller
            m.zeropoint = 23.0;
            m.flux /= 100.0;
            m.flux_err /= 100.0;
            m
        })
        .collect();
    let output = run_default(&rows);

    let r = output.rows.iter().find(|r| r.group == key(1)).unwrap();
    assert_eq!(r.measurement.zeropoint, 23.0);
    assert_abs_diff_eq!(r.baseline.unwrap(), 0.5, epsilon = 0.005);

    let at_peak = output
        .rows
        .iter()
        .find(|r| r.group == key(1) && r.measurement.mjd == PEAK_MJD)
        .unwrap();
    let reference = run_default(&two_band_transient());
    let ref_peak = reference
        .rows
        .iter()
        .find(|r| r.group == key(1) && r.measurement.mjd == PEAK_MJD)
        .unwrap();
    let (mag, _) = at_peak.magnitude().unwrap();
    let (ref_mag, _) = ref_peak.magnitude().unwrap();
    assert_abs_diff_eq!(mag, ref_mag, epsilon = 1e-9);
}

// ---------------------------------------------------------------------------
// Reference gate
// ---------------------------------------------------------------------------

#[test]
fn test_reference_gate_drops_contaminated_group() {
    let source = StaticReferenceEpochs::new(ReferenceEpochs::from([
        (key(1), PEAK_MJD - 10.0),
        (key(2), PEAK_MJD - 100.0),
    ]));
    let output = run_pipeline(&two_band_transient(), &PipelineConfig::default(), &source).unwrap();

    assert!(output.rows.iter().all(|r| r.group == key(2)));
    assert_eq!(output.rows.len(), 251);

    let diag = &output.diagnostics;
    assert!(diag.groups[&key(1)].excluded_by_reference);
    assert_eq!(diag.groups[&key(1)].reference_end_mjd, Some(PEAK_MJD - 10.0));
    assert!(!diag.groups[&key(2)].excluded_by_reference);
    assert!(!diag.reference_lookup_failed);
    // the global peak keeps both contributors
    assert_eq!(diag.peak.unwrap().contributors, 2);
}

#[test]
fn test_reference_gate_disabled_by_zero_margin() {
    let source = StaticReferenceEpochs::new(ReferenceEpochs::from([(key(1), PEAK_MJD)]));
    let mut config = PipelineConfig::default();
    config.reference.margin_days = Some(0.0);
    let output = run_pipeline(&two_band_transient(), &config, &source).unwrap();
    assert_eq!(output.rows.len(), 2 * 251);

    config.reference.margin_days = None;
    let output = run_pipeline(&two_band_transient(), &config, &source).unwrap();
    assert_eq!(output.rows.len(), 2 * 251);
}

// ---------------------------------------------------------------------------
// Quality filters inside the run
// ---------------------------------------------------------------------------

#[test]
fn test_raising_min_samples_never_adds_groups() {
    let mut rows = two_band_transient();
    rows.extend(flat_series(5, 58_000.0, 30, 20.0, 10.0, 1.0));

    let mut previous = usize::MAX;
    for min_samples in [1, 30, 200, 300] {
        let mut config = PipelineConfig::default();
        config.quality.min_samples_per_group = min_samples;
        let groups = summarize_groups(&rows, &config).unwrap();
        assert!(groups.len() <= previous);
        previous = groups.len();
    }
    assert_eq!(previous, 0);
}

#[test]
fn test_failed_rows_are_reported() {
    let mut rows = two_band_transient();
    rows[0].pass = false;
    let output = run_default(&rows);
    assert_eq!(output.diagnostics.quality.failed_pass_flag, 1);
    assert_eq!(output.diagnostics.quality.input_rows, rows.len());
    assert!(output.rows.iter().all(|r| r.measurement.row != 0));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_row_fails_the_run() {
    let mut rows = two_band_transient();
    rows[7].flux_err = -1.0;
    match run_default_err(&rows) {
        BaselineError::InvalidMeasurement { row, .. } => assert_eq!(row, 7),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_config_fails_the_run() {
    let mut config = PipelineConfig::default();
    config.peak.window_days = 0.0;
    let result = run_pipeline(&two_band_transient(), &config, &NoReferenceEpochs);
    assert!(matches!(result, Err(BaselineError::InvalidConfig(_))));
}

fn run_default_err(rows: &[Measurement]) -> BaselineError {
    run_pipeline(rows, &PipelineConfig::default(), &NoReferenceEpochs).unwrap_err()
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CountingReporter {
    stages: Mutex<Vec<PipelineStage>>,
    totals: Mutex<Vec<Option<usize>>>,
    advances: Mutex<Vec<(PipelineStage, usize)>>,
    finished: AtomicUsize,
}

impl ProgressReporter for CountingReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
        self.totals.lock().unwrap().push(total_items);
    }

    fn advance(&self, items_done: usize) {
        let stage = *self.stages.lock().unwrap().last().unwrap();
        self.advances.lock().unwrap().push((stage, items_done));
    }

    fn finish_stage(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_reporter_sees_every_stage() {
    let reporter = Arc::new(CountingReporter::default());
    run_pipeline_reported(
        &two_band_transient(),
        &PipelineConfig::default(),
        &NoReferenceEpochs,
        reporter.clone(),
    )
    .unwrap();

    let stages = reporter.stages.lock().unwrap();
    assert_eq!(
        *stages,
        vec![
            PipelineStage::Validating,
            PipelineStage::QualityFilter,
            PipelineStage::Grouping,
            PipelineStage::PeakSearch,
            PipelineStage::ReferenceGate,
            PipelineStage::BaselineEstimation,
            PipelineStage::Correction,
        ]
    );
    assert_eq!(reporter.finished.load(Ordering::SeqCst), stages.len());
}

#[test]
fn test_reporter_counts_groups_in_parallel_stages() {
    let mut rows = two_band_transient();
    // a filter-3 group is skipped by the peak search but still counted
    rows.extend(flat_series(3, 58_000.0, 30, 20.0, 10.0, 1.0));
    let reporter = Arc::new(CountingReporter::default());
    run_pipeline_reported(
        &rows,
        &PipelineConfig::default(),
        &NoReferenceEpochs,
        reporter.clone(),
    )
    .unwrap();

    let stages = reporter.stages.lock().unwrap();
    let totals = reporter.totals.lock().unwrap();
    let advances = reporter.advances.lock().unwrap();
    for stage in [PipelineStage::PeakSearch, PipelineStage::BaselineEstimation] {
        let idx = stages.iter().position(|s| *s == stage).unwrap();
        assert_eq!(totals[idx], Some(3));

        let mut done: Vec<usize> = advances
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, n)| *n)
            .collect();
        done.sort_unstable();
        assert_eq!(done, vec![1, 2, 3], "{stage}");
    }
    assert!(advances.iter().all(|(s, _)| matches!(
        s,
        PipelineStage::PeakSearch | PipelineStage::BaselineEstimation
    )));
}
