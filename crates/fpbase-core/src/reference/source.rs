use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::grouping::GroupKey;

use super::ReferenceEpochs;

/// Provider of reference-image end epochs.
///
/// Implementations answer one batched request per run. Keys they know
/// nothing about are simply left out of the returned map.
pub trait ReferenceEpochSource: Send + Sync {
    /// Human-readable source name for logs.
    fn name(&self) -> &str;

    fn end_epochs(&self, keys: &BTreeSet<GroupKey>) -> Result<ReferenceEpochs>;
}

/// Source that knows nothing; every group keeps its data.
pub struct NoReferenceEpochs;

impl ReferenceEpochSource for NoReferenceEpochs {
    fn name(&self) -> &str {
        "none"
    }

    fn end_epochs(&self, _keys: &BTreeSet<GroupKey>) -> Result<ReferenceEpochs> {
        Ok(ReferenceEpochs::new())
    }
}

/// In-memory table of reference end epochs.
#[derive(Clone, Debug, Default)]
pub struct StaticReferenceEpochs {
    epochs: ReferenceEpochs,
}

#[derive(Deserialize)]
struct EpochRow {
    fcqfid: u64,
    end_mjd: f64,
}

impl StaticReferenceEpochs {
    pub fn new(epochs: ReferenceEpochs) -> Self {
        Self { epochs }
    }

    /// Read a CSV table with `fcqfid` and `end_mjd` columns.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut epochs = ReferenceEpochs::new();
        for row in csv_reader.deserialize::<EpochRow>() {
            let row = row?;
            epochs.insert(GroupKey::from_fcqfid(row.fcqfid)?, row.end_mjd);
        }
        Ok(Self { epochs })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

impl ReferenceEpochSource for StaticReferenceEpochs {
    fn name(&self) -> &str {
        "static"
    }

    fn end_epochs(&self, keys: &BTreeSet<GroupKey>) -> Result<ReferenceEpochs> {
        Ok(keys
            .iter()
            .filter_map(|k| self.epochs.get(k).map(|&mjd| (*k, mjd)))
            .collect())
    }
}
