//! Daily tier ranking
//!
//! Four continuous metrics are bucketed into quartiles across every
//! body-part-side with a positive value on the processing date. The quartile
//! boundaries sit at `max - k * width` for k = 1, 2, 3 where
//! `width = (max - min) / 4`, and a value belongs to the first quartile whose
//! boundary it reaches. The relative load level shifts the tier numbers:
//!
//! | level | top | 2nd | 3rd | bottom |
//! |-------|-----|-----|-----|--------|
//! | 1     | 1   | 2   | 3   | 4      |
//! | 2     | 2   | 3   | 4   | 5      |
//! | 3     | 3   | 4   | 5   | 0      |
//!
//! Mobility and weakness tiers come from 0-20 day counters instead.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::injury_risk::{BodyPartInjuryRisk, MAX_LOAD_TIER};
use crate::models::BodyPartSide;
use crate::relative_load::RelativeLoadLevel;

/// Quartile boundaries for one metric on one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantileBounds {
    pub min: Decimal,
    pub max: Decimal,
    pub width: Decimal,
    pub boundaries: [Decimal; 3],
}

impl QuantileBounds {
    /// Bounds over the positive values, `None` when there are none
    pub fn from_values(values: impl IntoIterator<Item = Decimal>) -> Option<Self> {
        let positive: Vec<Decimal> = values.into_iter().filter(|v| *v > Decimal::ZERO).collect();
        let min = positive.iter().copied().min()?;
        let max = positive.iter().copied().max()?;

        let width = if max > min {
            (max - min) / Decimal::from(4)
        } else {
            Decimal::ZERO
        };
        let boundaries = [
            max - width,
            max - width * Decimal::from(2),
            max - width * Decimal::from(3),
        ];

        Some(Self {
            min,
            max,
            width,
            boundaries,
        })
    }

    /// Quartile index, 0 being the top quartile
    pub fn quartile(&self, value: Decimal) -> u8 {
        self.boundaries
            .iter()
            .position(|boundary| value >= *boundary)
            .map_or(3, |index| index as u8)
    }

    /// Tier for a value at the given relative load level
    pub fn tier(&self, value: Decimal, level: RelativeLoadLevel) -> u8 {
        if value <= Decimal::ZERO {
            return 0;
        }
        let tier = level.value() + self.quartile(value);
        if tier > MAX_LOAD_TIER {
            0
        } else {
            tier
        }
    }
}

/// The four load metrics that are tiered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierMetric {
    TotalCompensationPercent,
    EccentricCompensationPercent,
    TotalVolume,
    EccentricVolume,
}

impl TierMetric {
    pub const ALL: [TierMetric; 4] = [
        TierMetric::TotalCompensationPercent,
        TierMetric::EccentricCompensationPercent,
        TierMetric::TotalVolume,
        TierMetric::EccentricVolume,
    ];

    pub fn value(&self, record: &BodyPartInjuryRisk) -> Decimal {
        match self {
            TierMetric::TotalCompensationPercent => record.total_compensation_percent,
            TierMetric::EccentricCompensationPercent => record.eccentric_compensation_percent,
            TierMetric::TotalVolume => record.total_volume_today().lowest_value(),
            TierMetric::EccentricVolume => record.eccentric_volume_today.lowest_value(),
        }
    }

    pub fn tier(&self, record: &BodyPartInjuryRisk) -> u8 {
        match self {
            TierMetric::TotalCompensationPercent => record.total_compensation_percent_tier,
            TierMetric::EccentricCompensationPercent => record.eccentric_compensation_percent_tier,
            TierMetric::TotalVolume => record.total_volume_tier,
            TierMetric::EccentricVolume => record.eccentric_volume_tier,
        }
    }

    fn tier_mut<'r>(&self, record: &'r mut BodyPartInjuryRisk) -> &'r mut u8 {
        match self {
            TierMetric::TotalCompensationPercent => &mut record.total_compensation_percent_tier,
            TierMetric::EccentricCompensationPercent => &mut record.eccentric_compensation_percent_tier,
            TierMetric::TotalVolume => &mut record.total_volume_tier,
            TierMetric::EccentricVolume => &mut record.eccentric_volume_tier,
        }
    }
}

/// Counts of what the ranking assigned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierSummary {
    pub tiered_records: usize,
    pub carried_over: usize,
    pub excessive_strain: usize,
}

pub struct TierRanker {
    mobility_tier_count: u32,
}

impl TierRanker {
    pub fn new(mobility_tier_count: u32) -> Self {
        Self { mobility_tier_count }
    }

    /// Recompute every tier for `date`, then mark excessive strain
    pub fn update_injury_risk_dict_rankings(
        &self,
        records: &mut BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
        level: RelativeLoadLevel,
        date: NaiveDate,
    ) -> TierSummary {
        let mut summary = TierSummary::default();
        let yesterday = date - Duration::days(1);

        for metric in TierMetric::ALL {
            let bounds = QuantileBounds::from_values(records.values().map(|r| metric.value(r)));

            match bounds {
                Some(bounds) => {
                    debug!(?metric, min = %bounds.min, max = %bounds.max, width = %bounds.width, "Tier bounds");
                    for record in records.values_mut() {
                        let value = metric.value(record);
                        *metric.tier_mut(record) = bounds.tier(value, level);
                    }
                }
                None if metric == TierMetric::TotalVolume => {
                    for record in records.values_mut() {
                        let previous = record.total_volume_tier;
                        record.total_volume_tier =
                            if record.last_non_functional_overreaching_date == Some(yesterday) {
                                summary.carried_over += 1;
                                if previous > 0 {
                                    previous.min(3)
                                } else {
                                    3
                                }
                            } else {
                                0
                            };
                    }
                }
                None => {
                    for record in records.values_mut() {
                        *metric.tier_mut(record) = 0;
                    }
                }
            }
        }

        for record in records.values_mut() {
            self.update_mobility_tiers(record, date);
            if self.mark_excessive_strain(record, date) {
                summary.excessive_strain += 1;
            }
            if TierMetric::ALL.iter().any(|metric| metric.tier(record) > 0) {
                summary.tiered_records += 1;
            }
        }

        summary
    }

    /// Limited mobility and underactive weakness from 0-20 day counters
    pub fn update_mobility_tiers(&self, record: &mut BodyPartInjuryRisk, date: NaiveDate) {
        if record.dysfunction_on(date) {
            record.limited_mobility_tier = 1;
            record.underactive_weak_tier = 1;
            return;
        }

        let has_votes = record.has_votes();
        record.limited_mobility_tier = self.counter_tier(
            &[
                record.short_count_last_0_20_days,
                record.overactive_short_count_last_0_20_days,
                record.underactive_short_count_last_0_20_days,
            ],
            has_votes,
        );
        record.underactive_weak_tier = self.counter_tier(
            &[
                record.underactive_short_count_last_0_20_days,
                record.underactive_long_count_last_0_20_days,
                record.weak_count_last_0_20_days,
            ],
            has_votes,
        );
    }

    fn counter_tier(&self, counts: &[u32], has_votes: bool) -> u8 {
        if counts.iter().any(|c| *c >= self.mobility_tier_count) {
            1
        } else if counts.iter().any(|c| *c > 0) {
            2
        } else if has_votes {
            3
        } else {
            0
        }
    }

    /// Flag high same-day volume; returns whether strain was marked
    pub fn mark_excessive_strain(&self, record: &mut BodyPartInjuryRisk, date: NaiveDate) -> bool {
        if !matches!(record.total_volume_tier, 1 | 2) {
            return false;
        }

        record.last_excessive_strain_date = Some(date);
        let today = Some(date);
        if record.last_inflammation_date == today || record.last_muscle_spasm_date == today {
            record.last_non_functional_overreaching_date = today;
        } else {
            record.last_functional_overreaching_date = today;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyPartLocation, LoadRange, Side};
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, day).unwrap()
    }

    fn create_test_records(volumes: &[Decimal]) -> BTreeMap<BodyPartSide, BodyPartInjuryRisk> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, volume)| {
                let mut record = BodyPartInjuryRisk::new();
                record.concentric_volume_today = LoadRange::exact(*volume);
                record.update_compensation_percents();
                (BodyPartSide::new(BodyPartLocation(40 + i as u16), Side::Left), record)
            })
            .collect()
    }

    fn tiers(records: &BTreeMap<BodyPartSide, BodyPartInjuryRisk>) -> Vec<u8> {
        records.values().map(|r| r.total_volume_tier).collect()
    }

    #[test]
    fn test_quartile_bounds() {
        let bounds =
            QuantileBounds::from_values(vec![dec!(100), dec!(75), dec!(50), dec!(25), dec!(0)]).unwrap();

        assert_eq!(bounds.width, dec!(18.75));
        assert_eq!(bounds.boundaries, [dec!(81.25), dec!(62.5), dec!(43.75)]);
        assert_eq!(bounds.quartile(dec!(81.25)), 0);
        assert_eq!(bounds.quartile(dec!(81.24)), 1);
        assert_eq!(bounds.quartile(dec!(25)), 3);
    }

    #[test]
    fn test_no_positive_values() {
        assert!(QuantileBounds::from_values(vec![dec!(0), dec!(-1)]).is_none());
        assert!(QuantileBounds::from_values(Vec::new()).is_none());
    }

    #[test]
    fn test_degenerate_width_puts_everything_on_top() {
        let bounds = QuantileBounds::from_values(vec![dec!(40), dec!(40)]).unwrap();
        assert_eq!(bounds.width, Decimal::ZERO);
        assert_eq!(bounds.tier(dec!(40), RelativeLoadLevel::High), 1);
        assert_eq!(bounds.tier(dec!(40), RelativeLoadLevel::Low), 3);
    }

    #[test]
    fn test_level_shifts_tiers() {
        let volumes = [dec!(100), dec!(75), dec!(50), dec!(25)];
        let ranker = TierRanker::new(3);

        let expectations = [
            (RelativeLoadLevel::Low, vec![3, 4, 5, 0]),
            (RelativeLoadLevel::Moderate, vec![2, 3, 4, 5]),
            (RelativeLoadLevel::High, vec![1, 2, 3, 4]),
        ];
        for (level, expected) in expectations {
            let mut records = create_test_records(&volumes);
            ranker.update_injury_risk_dict_rankings(&mut records, level, date(2));
            assert_eq!(tiers(&records), expected, "level {}", level);
        }
    }

    #[test]
    fn test_non_positive_values_get_no_tier() {
        let mut records = create_test_records(&[dec!(80), dec!(0)]);
        TierRanker::new(3).update_injury_risk_dict_rankings(&mut records, RelativeLoadLevel::High, date(2));

        assert_eq!(tiers(&records), vec![1, 0]);
        // no compensation anywhere
        assert!(records.values().all(|r| r.total_compensation_percent_tier == 0));
    }

    #[test]
    fn test_total_volume_carry_over() {
        let mut records = create_test_records(&[dec!(0), dec!(0), dec!(0)]);
        let mut values = records.values_mut();

        let first = values.next().unwrap();
        first.last_non_functional_overreaching_date = Some(date(1));
        first.total_volume_tier = 5;

        let second = values.next().unwrap();
        second.last_non_functional_overreaching_date = Some(date(1));

        let third = values.next().unwrap();
        third.total_volume_tier = 2;

        let summary =
            TierRanker::new(3).update_injury_risk_dict_rankings(&mut records, RelativeLoadLevel::Low, date(2));

        assert_eq!(tiers(&records), vec![3, 3, 0]);
        assert_eq!(summary.carried_over, 2);
    }

    #[test]
    fn test_mobility_tiers() {
        let ranker = TierRanker::new(3);
        let mut record = BodyPartInjuryRisk::new();

        ranker.update_mobility_tiers(&mut record, date(5));
        assert_eq!((record.limited_mobility_tier, record.underactive_weak_tier), (0, 0));

        record.weak_vote_count = 1;
        ranker.update_mobility_tiers(&mut record, date(5));
        assert_eq!((record.limited_mobility_tier, record.underactive_weak_tier), (3, 3));

        record.short_count_last_0_20_days = 3;
        record.weak_count_last_0_20_days = 2;
        ranker.update_mobility_tiers(&mut record, date(5));
        assert_eq!((record.limited_mobility_tier, record.underactive_weak_tier), (1, 2));

        record.short_count_last_0_20_days = 0;
        record.last_dysfunction_cause_date = Some(date(5));
        ranker.update_mobility_tiers(&mut record, date(5));
        assert_eq!((record.limited_mobility_tier, record.underactive_weak_tier), (1, 1));
    }

    #[test]
    fn test_excessive_strain() {
        let ranker = TierRanker::new(3);
        let mut records = create_test_records(&[dec!(100), dec!(10)]);
        records
            .values_mut()
            .next()
            .unwrap()
            .last_muscle_spasm_date = Some(date(3));

        let summary = ranker.update_injury_risk_dict_rankings(&mut records, RelativeLoadLevel::High, date(3));

        let flagged: Vec<&BodyPartInjuryRisk> = records.values().collect();
        assert_eq!(summary.excessive_strain, 1);
        assert_eq!(flagged[0].last_excessive_strain_date, Some(date(3)));
        assert_eq!(flagged[0].last_non_functional_overreaching_date, Some(date(3)));
        assert_eq!(flagged[0].last_functional_overreaching_date, None);
        // bottom quartile at level 1 is tier 4
        assert_eq!(flagged[1].total_volume_tier, 4);
        assert_eq!(flagged[1].last_excessive_strain_date, None);
    }
}
