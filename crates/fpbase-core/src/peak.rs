//! Peak-epoch estimation.
//!
//! Each group's pull series (flux / uncertainty) is smoothed with a centered
//! rolling median over calendar time; the time of the smoothed maximum is the
//! group's local peak. Groups whose peak stands out from the flux scatter
//! contribute to one global peak epoch shared by the whole run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::grouping::{GroupKey, GroupMap};
use crate::measurement::Measurement;
use crate::pipeline::config::PeakConfig;
use crate::stats::rolling::argmax;
use crate::stats::{mad_normal, rolling_median_centered};

/// Peak found in a single group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalPeak {
    /// Time (MJD) of the rolling-median maximum.
    pub time: f64,
    /// Raw flux at that sample.
    pub flux: f64,
    /// Peak flux over the normal-scaled MAD of the group's flux.
    pub snr: f64,
    /// Whether this peak enters the global estimate.
    pub contributes: bool,
}

/// Global peak epoch of one run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeakEstimate {
    /// Mean of the contributing local peak times (MJD).
    pub time: f64,
    pub contributors: usize,
    /// Sample standard deviation of the local peak times, when defined.
    pub scatter_days: Option<f64>,
    pub scatter_warning: bool,
}

/// Local peaks of every searched group plus the combined estimate.
#[derive(Clone, Debug, Default)]
pub struct PeakSearch {
    pub local: BTreeMap<GroupKey, LocalPeak>,
    pub estimate: Option<PeakEstimate>,
}

impl PeakSearch {
    /// Keys whose local peak entered the global estimate.
    pub fn contributing_keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.local
            .iter()
            .filter(|(_, p)| p.contributes)
            .map(|(k, _)| k)
    }
}

/// Search every group for its local peak and combine the qualifying ones.
///
/// Groups run in parallel; the combined estimate is only formed after all
/// of them have finished.
pub fn search_peaks(groups: &GroupMap, config: &PeakConfig) -> PeakSearch {
    search_peaks_with_progress(groups, config, |_| {})
}

/// Peak search with per-group progress reporting.
///
/// Calls `on_progress(items_done)` as each group is searched, skipped ones
/// included.
pub fn search_peaks_with_progress(
    groups: &GroupMap,
    config: &PeakConfig,
    on_progress: impl Fn(usize) + Send + Sync,
) -> PeakSearch {
    let done = AtomicUsize::new(0);
    let local: BTreeMap<GroupKey, LocalPeak> = groups
        .par_iter()
        .filter_map(|(key, members)| {
            let peak = local_peak_of(key, members, config);
            on_progress(done.fetch_add(1, Ordering::Relaxed) + 1);
            peak.map(|p| (*key, p))
        })
        .collect();

    let times: Vec<f64> = local
        .values()
        .filter(|p| p.contributes)
        .map(|p| p.time)
        .collect();
    let estimate = combine_peak_times(&times, config.scatter_warning_days);

    match &estimate {
        Some(est) => {
            info!(
                peak_mjd = est.time,
                contributors = est.contributors,
                "Global peak estimated"
            );
            if est.scatter_warning {
                warn!(
                    scatter_days = est.scatter_days,
                    "Large scatter in time of maximum between groups"
                );
            }
        }
        None => info!("No group reached the peak SNR threshold"),
    }

    PeakSearch { local, estimate }
}

fn local_peak_of(
    key: &GroupKey,
    members: &[Measurement],
    config: &PeakConfig,
) -> Option<LocalPeak> {
    if config.excluded_filters.contains(&key.filter()) {
        return None;
    }
    let (time, flux, snr) = find_local_peak(members, config.window_days)?;
    let contributes =
        snr > config.min_peak_snr && !(config.require_primary_grid && key.is_secondary_grid());
    debug!(group = %key, time, flux, snr, contributes, "Local peak");
    Some(LocalPeak {
        time,
        flux,
        snr,
        contributes,
    })
}

/// Local peak `(time, flux, snr)` of one time-ordered group.
///
/// Returns `None` for groups with fewer than two samples.
pub fn find_local_peak(members: &[Measurement], window_days: f64) -> Option<(f64, f64, f64)> {
    if members.len() < 2 {
        return None;
    }
    let times: Vec<f64> = members.iter().map(|m| m.mjd).collect();
    let pulls: Vec<f64> = members.iter().map(Measurement::pull).collect();
    let smoothed = rolling_median_centered(&times, &pulls, window_days);
    let idx = argmax(&smoothed)?;

    let fluxes: Vec<f64> = members.iter().map(|m| m.flux).collect();
    let scatter = mad_normal(&fluxes)?;
    let flux = members[idx].flux;
    Some((members[idx].mjd, flux, flux / scatter))
}

/// Mean of the local peak times, with a scatter check when more than one
/// group contributed.
pub fn combine_peak_times(times: &[f64], scatter_warning_days: f64) -> Option<PeakEstimate> {
    if times.is_empty() {
        return None;
    }
    let n = times.len() as f64;
    let mean = times.iter().sum::<f64>() / n;
    let scatter_days = if times.len() > 1 {
        let var = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    } else {
        None
    };
    Some(PeakEstimate {
        time: mean,
        contributors: times.len(),
        scatter_days,
        scatter_warning: scatter_days.is_some_and(|s| s > scatter_warning_days),
    })
}
