use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::baseline::{BaselineSide, GroupBaseline, TransientWindow};
use crate::correct::CorrectedMeasurement;
use crate::grouping::GroupKey;
use crate::peak::{LocalPeak, PeakEstimate};
use crate::quality::QualityReport;
use crate::stats::ClippedStats;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    QualityFilter,
    Grouping,
    PeakSearch,
    ReferenceGate,
    BaselineEstimation,
    Correction,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validating => write!(f, "Validating input"),
            Self::QualityFilter => write!(f, "Quality filters"),
            Self::Grouping => write!(f, "Grouping"),
            Self::PeakSearch => write!(f, "Searching peaks"),
            Self::ReferenceGate => write!(f, "Checking references"),
            Self::BaselineEstimation => write!(f, "Estimating baselines"),
            Self::Correction => write!(f, "Correcting fluxes"),
        }
    }
}

/// Per-group diagnostics of one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDiagnostics {
    /// Rows of the group after quality filtering.
    pub samples: usize,
    pub local_peak: Option<LocalPeak>,
    pub reference_end_mjd: Option<f64>,
    pub excluded_by_reference: bool,
    pub excluded_channel: bool,
    pub pre_inliers: usize,
    pub post_inliers: usize,
    pub pre: Option<ClippedStats>,
    pub post: Option<ClippedStats>,
    pub side: BaselineSide,
}

impl GroupDiagnostics {
    pub(super) fn record_baseline(&mut self, baseline: &GroupBaseline) {
        self.excluded_channel = baseline.excluded_channel;
        self.pre_inliers = baseline.pre_inliers();
        self.post_inliers = baseline.post_inliers();
        self.pre = baseline.pre;
        self.post = baseline.post;
        self.side = baseline.side();
    }
}

/// Run-level diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineDiagnostics {
    /// Global peak, absent when no group qualified.
    pub peak: Option<PeakEstimate>,
    pub transient_window: Option<TransientWindow>,
    pub quality: QualityReport,
    pub reference_lookup_failed: bool,
    pub groups: BTreeMap<GroupKey, GroupDiagnostics>,
}

impl BaselineDiagnostics {
    pub fn peak_time(&self) -> Option<f64> {
        self.peak.map(|p| p.time)
    }

    /// Number of groups per chosen side; gated groups are not counted.
    pub fn side_counts(&self) -> (usize, usize, usize) {
        self.groups
            .values()
            .filter(|g| !g.excluded_by_reference)
            .fold((0, 0, 0), |(pre, post, none), g| match g.side {
                BaselineSide::Pre => (pre + 1, post, none),
                BaselineSide::Post => (pre, post + 1, none),
                BaselineSide::None => (pre, post, none + 1),
            })
    }
}

/// Corrected table plus diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    pub rows: Vec<CorrectedMeasurement>,
    pub diagnostics: BaselineDiagnostics,
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., group count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
