use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::baseline::{derive_window, estimate_baselines_with_progress};
use crate::correct::{correct_fluxes, normalize_zeropoints, restore_native_scale};
use crate::error::Result;
use crate::grouping::{group_measurements, GroupMap};
use crate::measurement::{number_rows, validate_table, Measurement};
use crate::peak::search_peaks_with_progress;
use crate::quality::apply_quality_filters;
use crate::reference::{run_reference_gate, ReferenceEpochSource, ReferenceGateOutcome};

use super::config::PipelineConfig;
use super::types::{
    BaselineDiagnostics, GroupDiagnostics, NoOpReporter, PipelineOutput, PipelineStage,
    ProgressReporter,
};

/// Run the full baseline-correction pipeline with a thread-safe progress
/// reporter.
///
/// `measurements` is the input table; each row's `row` is reassigned to its
/// position in the slice. Fails only on invalid configuration or input.
pub fn run_pipeline_reported(
    measurements: &[Measurement],
    config: &PipelineConfig,
    reference: &dyn ReferenceEpochSource,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    config.validate()?;

    reporter.begin_stage(PipelineStage::Validating, Some(measurements.len()));
    let mut table = measurements.to_vec();
    number_rows(&mut table);
    validate_table(&table)?;
    reporter.finish_stage();
    info!(rows = table.len(), "Input table validated");

    reporter.begin_stage(PipelineStage::QualityFilter, None);
    let (mut surviving, quality) = apply_quality_filters(table.clone(), &config.quality);
    if config.output.normalize_zeropoint {
        surviving = normalize_zeropoints(surviving, config.output.pivot_zeropoint);
    }
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Grouping, None);
    let mut groups = group_measurements(&surviving)?;
    reporter.finish_stage();
    info!(groups = groups.len(), "Measurements grouped");

    let mut diagnostics = BaselineDiagnostics {
        quality,
        groups: groups
            .iter()
            .map(|(key, members)| {
                (
                    *key,
                    GroupDiagnostics {
                        samples: members.len(),
                        ..Default::default()
                    },
                )
            })
            .collect(),
        ..Default::default()
    };

    reporter.begin_stage(PipelineStage::PeakSearch, Some(groups.len()));
    let r = reporter.clone();
    let peaks = search_peaks_with_progress(&groups, &config.peak, move |done| {
        r.advance(done);
    });
    for (key, peak) in &peaks.local {
        if let Some(g) = diagnostics.groups.get_mut(key) {
            g.local_peak = Some(*peak);
        }
    }
    diagnostics.peak = peaks.estimate;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::ReferenceGate, None);
    let gate = match config.reference.active_margin() {
        Some(margin) => run_reference_gate(reference, &peaks.local, margin),
        None => ReferenceGateOutcome::default(),
    };
    apply_gate(&mut groups, &gate, &mut diagnostics);
    reporter.finish_stage();

    let window = peaks.estimate.map(|est| {
        let remaining: Vec<Measurement> = groups.values().flatten().cloned().collect();
        derive_window(est.time, &config.window, &remaining)
    });
    diagnostics.transient_window = window;
    if let Some(w) = &window {
        info!(rise = w.rise, fall = w.fall, "Transient window");
    }

    reporter.begin_stage(PipelineStage::BaselineEstimation, Some(groups.len()));
    let r = reporter.clone();
    let baselines =
        estimate_baselines_with_progress(&groups, window.as_ref(), &config.baseline, move |done| {
            r.advance(done);
        });
    for (key, baseline) in &baselines {
        if let Some(g) = diagnostics.groups.get_mut(key) {
            g.record_baseline(baseline);
        }
    }
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Correction, None);
    let mut rows = correct_fluxes(&groups, &baselines, window.as_ref(), config.output.inclusion);
    if config.output.normalize_zeropoint {
        rows = restore_native_scale(rows, &table, config.output.pivot_zeropoint);
    }
    reporter.finish_stage();

    Ok(PipelineOutput { rows, diagnostics })
}

/// Remove gated groups and record the gate's verdicts.
fn apply_gate(
    groups: &mut GroupMap,
    gate: &ReferenceGateOutcome,
    diagnostics: &mut BaselineDiagnostics,
) {
    diagnostics.reference_lookup_failed = gate.lookup_failed;
    for (key, &end) in &gate.epochs {
        if let Some(g) = diagnostics.groups.get_mut(key) {
            g.reference_end_mjd = Some(end);
        }
    }
    for key in &gate.excluded {
        groups.remove(key);
        if let Some(g) = diagnostics.groups.get_mut(key) {
            g.excluded_by_reference = true;
        }
        info!(group = %key, "Group excluded: reference image too close to peak");
    }
}

/// Run the full baseline-correction pipeline.
pub fn run_pipeline(
    measurements: &[Measurement],
    config: &PipelineConfig,
    reference: &dyn ReferenceEpochSource,
) -> Result<PipelineOutput> {
    let reporter = Arc::new(NoOpReporter);
    run_pipeline_reported(measurements, config, reference, reporter)
}

/// Group sizes after validation and quality filtering, without running the
/// statistics. Used for table summaries.
pub fn summarize_groups(
    measurements: &[Measurement],
    config: &PipelineConfig,
) -> Result<BTreeMap<crate::grouping::GroupKey, usize>> {
    config.validate()?;
    let mut table = measurements.to_vec();
    number_rows(&mut table);
    validate_table(&table)?;
    let (surviving, _) = apply_quality_filters(table, &config.quality);
    Ok(group_measurements(&surviving)?
        .into_iter()
        .map(|(k, v)| (k, v.len()))
        .collect())
}
