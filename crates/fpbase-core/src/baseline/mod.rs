//! Per-group baseline estimation.
//!
//! Once the global peak is fixed, every group is reduced independently:
//! samples before the rise and after the fade form two candidate baseline
//! sets, each is outlier-clipped and averaged with inverse-variance weights,
//! and a sample-count policy picks which side (if any) becomes the group's
//! baseline.

pub mod window;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{BASELINE_MIN_SAMPLES, BASELINE_PREFERRED_SAMPLES};
use crate::grouping::{GroupKey, GroupMap};
use crate::measurement::Measurement;
use crate::pipeline::config::BaselineConfig;
use crate::stats::{clipped_weighted_mean, ClippedStats};

pub use window::{decay_falltime, derive_window, TransientWindow};

/// Which side of the transient a baseline was taken from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineSide {
    Pre,
    Post,
    /// No usable baseline; the group is not corrected.
    #[default]
    None,
}

impl fmt::Display for BaselineSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Baseline chosen for a group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub side: BaselineSide,
    /// Weighted mean flux of the chosen side's inliers.
    pub value: f64,
    /// `max(1, sqrt(reduced chi-square))` of the chosen side.
    pub error_multiplier: f64,
    /// Inliers used for the baseline.
    pub samples: usize,
}

impl Baseline {
    fn from_stats(side: BaselineSide, stats: &ClippedStats) -> Self {
        Self {
            side,
            value: stats.weighted_mean,
            error_multiplier: stats.error_multiplier(),
            samples: stats.inliers,
        }
    }
}

/// Everything computed for one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupBaseline {
    pub pre: Option<ClippedStats>,
    pub post: Option<ClippedStats>,
    pub chosen: Option<Baseline>,
    /// Group skipped because its filter channel is excluded.
    pub excluded_channel: bool,
}

impl GroupBaseline {
    pub fn pre_inliers(&self) -> usize {
        self.pre.map_or(0, |s| s.inliers)
    }

    pub fn post_inliers(&self) -> usize {
        self.post.map_or(0, |s| s.inliers)
    }

    pub fn side(&self) -> BaselineSide {
        self.chosen.map_or(BaselineSide::None, |b| b.side)
    }
}

/// Pick a baseline side from the inlier counts of both candidate sets.
///
/// Pre-peak wins with 25+ inliers, or with more than 10 when post-peak has
/// fewer than 25. Otherwise post-peak wins with 25+ inliers.
pub fn select_side(pre_inliers: usize, post_inliers: usize) -> BaselineSide {
    if pre_inliers >= BASELINE_PREFERRED_SAMPLES
        || (pre_inliers > BASELINE_MIN_SAMPLES && post_inliers < BASELINE_PREFERRED_SAMPLES)
    {
        BaselineSide::Pre
    } else if post_inliers >= BASELINE_PREFERRED_SAMPLES
        || (pre_inliers < BASELINE_MIN_SAMPLES && post_inliers >= BASELINE_PREFERRED_SAMPLES)
    {
        BaselineSide::Post
    } else {
        BaselineSide::None
    }
}

fn side_stats<'a>(members: impl Iterator<Item = &'a Measurement>) -> Option<ClippedStats> {
    let (flux, err): (Vec<f64>, Vec<f64>) = members.map(|m| (m.flux, m.flux_err)).unzip();
    clipped_weighted_mean(&flux, &err)
}

/// Estimate the baseline of one time-ordered group.
///
/// Without a transient window (no peak found) the whole group is the
/// pre-peak candidate set.
pub fn estimate_group(members: &[Measurement], window: Option<&TransientWindow>) -> GroupBaseline {
    let (pre, post) = match window {
        Some(w) => (
            side_stats(members.iter().filter(|m| w.is_before_rise(m.mjd))),
            side_stats(members.iter().filter(|m| w.is_after_fall(m.mjd))),
        ),
        None => (side_stats(members.iter()), None),
    };

    let pre_n = pre.map_or(0, |s| s.inliers);
    let post_n = post.map_or(0, |s| s.inliers);
    let chosen = match select_side(pre_n, post_n) {
        BaselineSide::Pre => pre.map(|s| Baseline::from_stats(BaselineSide::Pre, &s)),
        BaselineSide::Post => post.map(|s| Baseline::from_stats(BaselineSide::Post, &s)),
        BaselineSide::None => None,
    };

    GroupBaseline {
        pre,
        post,
        chosen,
        excluded_channel: false,
    }
}

/// Estimate baselines for every group in parallel.
pub fn estimate_baselines(
    groups: &GroupMap,
    window: Option<&TransientWindow>,
    config: &BaselineConfig,
) -> BTreeMap<GroupKey, GroupBaseline> {
    estimate_baselines_with_progress(groups, window, config, |_| {})
}

/// Baseline estimation with per-group progress reporting.
///
/// Calls `on_progress(items_done)` as each group is estimated.
pub fn estimate_baselines_with_progress(
    groups: &GroupMap,
    window: Option<&TransientWindow>,
    config: &BaselineConfig,
    on_progress: impl Fn(usize) + Send + Sync,
) -> BTreeMap<GroupKey, GroupBaseline> {
    let done = AtomicUsize::new(0);
    let results: BTreeMap<GroupKey, GroupBaseline> = groups
        .par_iter()
        .map(|(key, members)| {
            let result = if config.excluded_filters.contains(&key.filter()) {
                debug!(group = %key, "Filter channel excluded from baseline assignment");
                GroupBaseline {
                    excluded_channel: true,
                    ..Default::default()
                }
            } else {
                let result = estimate_group(members, window);
                debug!(
                    group = %key,
                    pre = result.pre_inliers(),
                    post = result.post_inliers(),
                    side = %result.side(),
                    "Group baseline"
                );
                result
            };
            on_progress(done.fetch_add(1, Ordering::Relaxed) + 1);
            (*key, result)
        })
        .collect();

    let corrected = results.values().filter(|r| r.chosen.is_some()).count();
    info!(
        groups = results.len(),
        with_baseline = corrected,
        "Baselines estimated"
    );
    results
}
