use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{
    FCQFID_CHIP_FACTOR, FCQFID_FIELD_FACTOR, FCQFID_QUADRANT_FACTOR, MAX_CHIP_ID, MAX_FIELD_ID,
    MAX_FILTER_ID, MAX_QUADRANT_ID, SECONDARY_GRID_FIELD_START,
};
use crate::error::{BaselineError, Result};
use crate::measurement::Measurement;

/// Identifier of one (field, chip, quadrant, filter) imaging configuration.
///
/// Components are checked against the digit budgets of the composite
/// `fcqfid` integer at construction, so two distinct keys never share a
/// composite value. Serialized as that composite integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u64", try_from = "u64")]
pub struct GroupKey {
    field: u32,
    chip: u8,
    quadrant: u8,
    filter: u8,
}

impl GroupKey {
    pub fn new(field: u32, chip: u32, quadrant: u32, filter: u32) -> Result<Self> {
        Ok(Self {
            field: check_budget("field", field, MAX_FIELD_ID as u32)?,
            chip: check_budget("chip", chip, MAX_CHIP_ID as u32)? as u8,
            quadrant: check_budget("quadrant", quadrant, MAX_QUADRANT_ID as u32)? as u8,
            filter: check_budget("filter", filter, MAX_FILTER_ID as u32)? as u8,
        })
    }

    /// Decode a composite `fcqfid` integer.
    pub fn from_fcqfid(fcqfid: u64) -> Result<Self> {
        let filter = fcqfid % FCQFID_QUADRANT_FACTOR;
        let quadrant = (fcqfid / FCQFID_QUADRANT_FACTOR) % 10;
        let chip = (fcqfid / FCQFID_CHIP_FACTOR) % 100;
        let field = fcqfid / FCQFID_FIELD_FACTOR;
        if field > MAX_FIELD_ID as u64 {
            return Err(BaselineError::GroupKeyOverflow {
                component: "field",
                value: field,
                max: MAX_FIELD_ID as u64,
            });
        }
        Self::new(field as u32, chip as u32, quadrant as u32, filter as u32)
    }

    /// Composite integer `field*10000 + chip*100 + quadrant*10 + filter`.
    pub fn fcqfid(&self) -> u64 {
        self.field as u64 * FCQFID_FIELD_FACTOR
            + self.chip as u64 * FCQFID_CHIP_FACTOR
            + self.quadrant as u64 * FCQFID_QUADRANT_FACTOR
            + self.filter as u64
    }

    pub fn field(&self) -> u32 {
        self.field
    }

    pub fn chip(&self) -> u8 {
        self.chip
    }

    pub fn quadrant(&self) -> u8 {
        self.quadrant
    }

    pub fn filter(&self) -> u8 {
        self.filter
    }

    /// Whether the field belongs to the secondary observation grid.
    pub fn is_secondary_grid(&self) -> bool {
        is_secondary_grid_field(self.field)
    }
}

pub fn is_secondary_grid_field(field: u32) -> bool {
    field >= SECONDARY_GRID_FIELD_START
}

fn check_budget(component: &'static str, value: u32, max: u32) -> Result<u32> {
    if value > max {
        return Err(BaselineError::GroupKeyOverflow {
            component,
            value: value as u64,
            max: max as u64,
        });
    }
    Ok(value)
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fcqfid())
    }
}

impl From<GroupKey> for u64 {
    fn from(key: GroupKey) -> Self {
        key.fcqfid()
    }
}

impl TryFrom<u64> for GroupKey {
    type Error = BaselineError;

    fn try_from(fcqfid: u64) -> Result<Self> {
        Self::from_fcqfid(fcqfid)
    }
}

/// Measurements of one group, sorted by (time, row).
pub type GroupMap = BTreeMap<GroupKey, Vec<Measurement>>;

/// Derive the group key of every measurement, in table order.
pub fn build_keys(measurements: &[Measurement]) -> Result<Vec<GroupKey>> {
    measurements.iter().map(Measurement::group_key).collect()
}

/// Split a table into time-ordered groups.
pub fn group_measurements(measurements: &[Measurement]) -> Result<GroupMap> {
    let mut groups = GroupMap::new();
    for m in measurements {
        groups.entry(m.group_key()?).or_default().push(m.clone());
    }
    for members in groups.values_mut() {
        sort_by_time(members);
    }
    Ok(groups)
}

/// Sort measurements by time, breaking ties by input row.
pub fn sort_by_time(measurements: &mut [Measurement]) {
    measurements.sort_by(|a, b| a.mjd.total_cmp(&b.mjd).then(a.row.cmp(&b.row)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fcqfid_composition() {
        let key = GroupKey::new(700, 12, 3, 2).unwrap();
        assert_eq!(key.fcqfid(), 7_001_232);
        assert_eq!(key.to_string(), "7001232");
    }

    #[test]
    fn test_from_fcqfid_inverts_composition() {
        let key = GroupKey::new(1831, 64, 4, 1).unwrap();
        assert_eq!(GroupKey::from_fcqfid(key.fcqfid()).unwrap(), key);
    }

    #[test]
    fn test_chip_overflow_rejected() {
        let err = GroupKey::new(700, 100, 1, 1).unwrap_err();
        assert!(matches!(
            err,
            BaselineError::GroupKeyOverflow {
                component: "chip",
                ..
            }
        ));
    }

    #[test]
    fn test_filter_overflow_rejected() {
        assert!(GroupKey::new(700, 1, 1, 10).is_err());
        assert!(GroupKey::new(700, 1, 10, 1).is_err());
    }

    #[test]
    fn test_secondary_grid() {
        assert!(!GroupKey::new(999, 1, 1, 1).unwrap().is_secondary_grid());
        assert!(GroupKey::new(1000, 1, 1, 1).unwrap().is_secondary_grid());
    }
}
