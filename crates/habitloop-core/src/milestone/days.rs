use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Day numbers celebrated out of the box.
pub const DEFAULT_MILESTONE_DAYS: [u32; 5] = [3, 7, 30, 50, 100];

/// Fixed ascending set of milestone day numbers.
///
/// Serialized as a plain list; deserializing goes through [`MilestoneDays::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct MilestoneDays(BTreeSet<u32>);

impl MilestoneDays {
    /// Build from any list of days. Rejects an empty set and day 0.
    pub fn new(days: impl IntoIterator<Item = u32>) -> Result<Self, ValidationError> {
        let set: BTreeSet<u32> = days.into_iter().collect();
        if set.is_empty() {
            return Err(ValidationError::Empty("milestone days".into()));
        }
        if set.contains(&0) {
            return Err(ValidationError::InvalidValue {
                field: "milestone days".into(),
                message: "day numbers start at 1".into(),
            });
        }
        Ok(Self(set))
    }

    pub fn is_milestone(&self, day: u32) -> bool {
        self.0.contains(&day)
    }

    /// The first milestone strictly after `day`.
    pub fn next_after(&self, day: u32) -> Option<u32> {
        self.0.range(day.saturating_add(1)..).next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MilestoneDays {
    fn default() -> Self {
        Self(DEFAULT_MILESTONE_DAYS.into_iter().collect())
    }
}

impl TryFrom<Vec<u32>> for MilestoneDays {
    type Error = ValidationError;

    fn try_from(days: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<MilestoneDays> for Vec<u32> {
    fn from(days: MilestoneDays) -> Self {
        days.0.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_days() {
        let days = MilestoneDays::default();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![3, 7, 30, 50, 100]);
        assert!(!days.is_milestone(14));
        assert!(!days.is_milestone(31));
        assert_eq!(days.next_after(7), Some(30));
    }

    #[test]
    fn next_after_skips_current_day() {
        let days = MilestoneDays::new([3, 7, 30]).unwrap();
        assert_eq!(days.next_after(0), Some(3));
        assert_eq!(days.next_after(3), Some(7));
        assert_eq!(days.next_after(8), Some(30));
        assert_eq!(days.next_after(30), None);
    }

    #[test]
    fn rejects_empty_and_zero() {
        assert!(MilestoneDays::new([]).is_err());
        assert!(MilestoneDays::new([0, 3]).is_err());
    }

    #[test]
    fn iterates_in_ascending_order() {
        let days = MilestoneDays::new([50, 3, 7]).unwrap();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![3, 7, 50]);
    }

    #[test]
    fn deserializing_validates() {
        assert!(serde_json::from_str::<MilestoneDays>("[]").is_err());
        assert!(serde_json::from_str::<MilestoneDays>("[0, 3]").is_err());

        let days: MilestoneDays = serde_json::from_str("[30, 3, 3]").unwrap();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![3, 30]);
        assert_eq!(serde_json::to_string(&days).unwrap(), "[3,30]");
    }
}
