//! Roll muscle-level records up into group views
//!
//! Each muscle record is merged exactly once into the record of its mapped
//! group (or visualization group) on the same side. Records with no mapping,
//! including joints and ligaments, keep their own key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::anatomy::AnatomyRegistry;
use crate::injury_risk::BodyPartInjuryRisk;
use crate::models::BodyPartSide;

/// Which map a run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputView {
    /// Per-muscle records as processed
    #[default]
    Muscle,
    /// Muscles merged into muscle groups
    Group,
    /// Muscles merged into the coarser visualization taxonomy
    Viz,
}

impl FromStr for OutputView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "muscle" => Ok(OutputView::Muscle),
            "group" => Ok(OutputView::Group),
            "viz" | "visualization" => Ok(OutputView::Viz),
            _ => Err(format!("Invalid output view: {}", s)),
        }
    }
}

impl fmt::Display for OutputView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputView::Muscle => write!(f, "muscle"),
            OutputView::Group => write!(f, "group"),
            OutputView::Viz => write!(f, "viz"),
        }
    }
}

pub struct GroupAggregator<'a> {
    anatomy: &'a dyn AnatomyRegistry,
}

impl<'a> GroupAggregator<'a> {
    pub fn new(anatomy: &'a dyn AnatomyRegistry) -> Self {
        Self { anatomy }
    }

    /// Key a record is reported under in `view`
    pub fn target_key(&self, body_part: BodyPartSide, view: OutputView) -> BodyPartSide {
        let location = body_part.body_part_location;
        let mapped = if self.anatomy.is_muscle(location) {
            match view {
                OutputView::Muscle => None,
                OutputView::Group => self.anatomy.muscle_group(location),
                OutputView::Viz => self.anatomy.viz_group(location),
            }
        } else {
            None
        };

        mapped.map_or(body_part, |group| BodyPartSide::new(group, body_part.side))
    }

    /// Build the map for `view` without touching `records`
    pub fn aggregate_ird(
        &self,
        records: &BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
        view: OutputView,
    ) -> BTreeMap<BodyPartSide, BodyPartInjuryRisk> {
        let mut aggregated: BTreeMap<BodyPartSide, BodyPartInjuryRisk> = BTreeMap::new();

        for (body_part, record) in records {
            let target = self.target_key(*body_part, view);
            let merged = match aggregated.get(&target) {
                Some(existing) => existing.merge(record),
                None => record.clone(),
            };
            aggregated.insert(target, merged);
        }

        aggregated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anatomy::StaticAnatomy;
    use crate::models::{BodyPartLocation, LoadRange, Side};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn create_test_record(ache: u32, day: u32, tier: u8) -> BodyPartInjuryRisk {
        let mut record = BodyPartInjuryRisk::new();
        record.ache_count_last_0_20_days = ache;
        record.last_ache_date = NaiveDate::from_ymd_opt(2024, 12, day);
        record.total_volume_tier = tier;
        record.eccentric_volume_today = LoadRange::exact(dec!(10));
        record
    }

    #[test]
    fn test_group_view_merges_by_group_and_side() {
        let anatomy = StaticAnatomy::new();
        let aggregator = GroupAggregator::new(&anatomy);

        let mut records = BTreeMap::new();
        records.insert(
            BodyPartSide::new(BodyPartLocation::VASTUS_LATERALIS, Side::Left),
            create_test_record(1, 3, 4),
        );
        records.insert(
            BodyPartSide::new(BodyPartLocation::RECTUS_FEMORIS, Side::Left),
            create_test_record(2, 5, 2),
        );
        records.insert(
            BodyPartSide::new(BodyPartLocation::RECTUS_FEMORIS, Side::Right),
            create_test_record(4, 1, 0),
        );
        records.insert(
            BodyPartSide::new(BodyPartLocation::KNEE, Side::Left),
            create_test_record(7, 2, 1),
        );

        let grouped = aggregator.aggregate_ird(&records, OutputView::Group);

        assert_eq!(grouped.len(), 3);
        let quads_left = &grouped[&BodyPartSide::new(BodyPartLocation::QUADS, Side::Left)];
        assert_eq!(quads_left.ache_count_last_0_20_days, 3);
        assert_eq!(quads_left.last_ache_date, NaiveDate::from_ymd_opt(2024, 12, 5));
        assert_eq!(quads_left.total_volume_tier, 2);
        assert_eq!(quads_left.eccentric_volume_today.observed_value, dec!(20));

        let quads_right = &grouped[&BodyPartSide::new(BodyPartLocation::QUADS, Side::Right)];
        assert_eq!(quads_right.ache_count_last_0_20_days, 4);

        // joints pass through under their own key
        let knee = &grouped[&BodyPartSide::new(BodyPartLocation::KNEE, Side::Left)];
        assert_eq!(knee.ache_count_last_0_20_days, 7);
    }

    #[test]
    fn test_viz_view_and_unmapped_muscles() {
        let anatomy = StaticAnatomy::new();
        let aggregator = GroupAggregator::new(&anatomy);

        let mut records = BTreeMap::new();
        records.insert(
            BodyPartSide::new(BodyPartLocation::PSOAS, Side::Right),
            create_test_record(1, 1, 0),
        );
        records.insert(
            BodyPartSide::new(BodyPartLocation::ILIACUS, Side::Right),
            create_test_record(1, 1, 0),
        );
        records.insert(
            BodyPartSide::new(BodyPartLocation::VASTUS_LATERALIS, Side::Right),
            create_test_record(1, 1, 0),
        );

        let viz = aggregator.aggregate_ird(&records, OutputView::Viz);

        assert_eq!(viz.len(), 2);
        assert_eq!(
            viz[&BodyPartSide::new(BodyPartLocation::HIP_FLEXOR_MERGE, Side::Right)].ache_count_last_0_20_days,
            2
        );
        assert!(viz.contains_key(&BodyPartSide::new(BodyPartLocation::VASTUS_LATERALIS, Side::Right)));
    }

    #[test]
    fn test_muscle_view_is_a_copy() {
        let anatomy = StaticAnatomy::new();
        let aggregator = GroupAggregator::new(&anatomy);

        let mut records = BTreeMap::new();
        records.insert(
            BodyPartSide::new(BodyPartLocation::SOLEUS, Side::Left),
            create_test_record(2, 2, 3),
        );

        assert_eq!(aggregator.aggregate_ird(&records, OutputView::Muscle), records);
    }

    #[test]
    fn test_output_view_parsing() {
        assert_eq!("group".parse::<OutputView>().unwrap(), OutputView::Group);
        assert_eq!("VIZ".parse::<OutputView>().unwrap(), OutputView::Viz);
        assert!("joint".parse::<OutputView>().is_err());
    }
}
