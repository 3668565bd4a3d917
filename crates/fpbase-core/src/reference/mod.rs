//! Reference-image contamination gate.
//!
//! A difference-flux measurement is only meaningful if the reference image it
//! was subtracted against contains no transient light. Groups whose reference
//! image ends too close to (or after) their local peak are excluded before any
//! baseline is computed.

#[cfg(feature = "http")]
pub mod http;
pub mod retry;
mod source;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::grouping::GroupKey;
use crate::peak::LocalPeak;

pub use retry::{is_retryable_status, retry_with_backoff, AttemptError, RetryPolicy};
pub use source::{NoReferenceEpochs, ReferenceEpochSource, StaticReferenceEpochs};

#[cfg(feature = "http")]
pub use http::HttpReferenceEpochs;

/// Partial mapping from group key to the end epoch (MJD) of its reference
/// image. Absent keys mean "unknown".
pub type ReferenceEpochs = BTreeMap<GroupKey, f64>;

/// Result of running the gate over one peak search.
#[derive(Clone, Debug, Default)]
pub struct ReferenceGateOutcome {
    /// Epochs returned by the source for the requested keys.
    pub epochs: ReferenceEpochs,
    /// Groups dropped because their reference is too close to the peak.
    pub excluded: BTreeSet<GroupKey>,
    /// The lookup failed and every key was treated as unknown.
    pub lookup_failed: bool,
}

/// Look up reference epochs for every contributing group in one batched
/// request and decide which groups to drop.
///
/// A failing source never aborts the run: the failure is logged and all
/// groups are kept as "no information".
pub fn run_reference_gate(
    source: &dyn ReferenceEpochSource,
    local_peaks: &BTreeMap<GroupKey, LocalPeak>,
    margin_days: f64,
) -> ReferenceGateOutcome {
    let keys: BTreeSet<GroupKey> = local_peaks
        .iter()
        .filter(|(_, p)| p.contributes)
        .map(|(k, _)| *k)
        .collect();
    if keys.is_empty() {
        return ReferenceGateOutcome::default();
    }

    let (epochs, lookup_failed) = match source.end_epochs(&keys) {
        Ok(epochs) => (
            epochs
                .into_iter()
                .filter(|(k, v)| keys.contains(k) && v.is_finite())
                .collect(),
            false,
        ),
        Err(e) => {
            warn!(
                source = source.name(),
                error = %e,
                "Reference epoch lookup failed; treating all references as unknown"
            );
            (ReferenceEpochs::new(), true)
        }
    };

    let excluded = gate_groups(local_peaks, &epochs, margin_days);
    info!(
        source = source.name(),
        requested = keys.len(),
        answered = epochs.len(),
        excluded = excluded.len(),
        "Reference epoch gate applied"
    );
    ReferenceGateOutcome {
        epochs,
        excluded,
        lookup_failed,
    }
}

/// Groups whose local peak is less than `margin_days` after the end of their
/// reference image.
pub fn gate_groups(
    local_peaks: &BTreeMap<GroupKey, LocalPeak>,
    epochs: &ReferenceEpochs,
    margin_days: f64,
) -> BTreeSet<GroupKey> {
    epochs
        .iter()
        .filter_map(|(key, &ref_end)| {
            let peak = local_peaks.get(key)?;
            (peak.time - ref_end < margin_days).then_some(*key)
        })
        .collect()
}
