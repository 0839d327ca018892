//! Muscle imbalance votes and promotion
//!
//! Movement-pattern analysis produces provisional votes per body-part-side in
//! four families plus an independent weak vote. A family is promoted to a
//! confirmed 0-20 day count only when it clearly wins:
//!
//! 1. at least `min_votes` votes
//! 2. strictly more votes than every other family of the same record
//! 3. at least `min_global_share_percent` of that family's votes across all records
//!
//! Families are evaluated in the fixed order of [`ImbalanceFamily::PRECEDENCE`]
//! and at most one is promoted per record per day.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{ImbalanceSettings, VoteCasterSettings};
use crate::injury_risk::{BodyPartInjuryRisk, PromotedState};
use crate::models::{BodyPartLocation, BodyPartSide, KinematicPattern, Side, TrainingSessionSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImbalanceFamily {
    OveractiveShort,
    OveractiveLong,
    UnderactiveShort,
    UnderactiveLong,
}

impl ImbalanceFamily {
    pub const PRECEDENCE: [ImbalanceFamily; 4] = [
        ImbalanceFamily::OveractiveShort,
        ImbalanceFamily::OveractiveLong,
        ImbalanceFamily::UnderactiveShort,
        ImbalanceFamily::UnderactiveLong,
    ];

    pub fn vote_count(&self, record: &BodyPartInjuryRisk) -> u32 {
        match self {
            ImbalanceFamily::OveractiveShort => record.overactive_short_vote_count,
            ImbalanceFamily::OveractiveLong => record.overactive_long_vote_count,
            ImbalanceFamily::UnderactiveShort => record.underactive_short_vote_count,
            ImbalanceFamily::UnderactiveLong => record.underactive_long_vote_count,
        }
    }

    fn vote_count_mut<'r>(&self, record: &'r mut BodyPartInjuryRisk) -> &'r mut u32 {
        match self {
            ImbalanceFamily::OveractiveShort => &mut record.overactive_short_vote_count,
            ImbalanceFamily::OveractiveLong => &mut record.overactive_long_vote_count,
            ImbalanceFamily::UnderactiveShort => &mut record.underactive_short_vote_count,
            ImbalanceFamily::UnderactiveLong => &mut record.underactive_long_vote_count,
        }
    }

    /// Confirmed state this family promotes to
    pub fn promoted_state(&self) -> PromotedState {
        match self {
            ImbalanceFamily::OveractiveShort => PromotedState::OveractiveShort,
            ImbalanceFamily::OveractiveLong => PromotedState::OveractiveLong,
            ImbalanceFamily::UnderactiveShort => PromotedState::UnderactiveShort,
            ImbalanceFamily::UnderactiveLong => PromotedState::UnderactiveLong,
        }
    }
}

/// What a vote supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteKind {
    Family(ImbalanceFamily),
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub body_part: BodyPartSide,
    pub kind: VoteKind,
}

/// Turns a session's movement analysis into votes
pub trait VoteCaster {
    fn cast_votes(&self, session: &TrainingSessionSummary) -> Vec<Vote>;
}

/// Which family and muscles a kinematic pattern implicates
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub family: ImbalanceFamily,
    pub muscles: Vec<BodyPartLocation>,
}

/// Votes from elasticity/drift pairs
///
/// A pattern side votes when its elasticity is large enough and its drift
/// statistic shows a stable relationship. Underactive families also cast a
/// weak vote.
pub struct ElasticityVoteCaster {
    settings: VoteCasterSettings,
    rules: BTreeMap<KinematicPattern, PatternRule>,
}

impl ElasticityVoteCaster {
    pub fn new(settings: VoteCasterSettings) -> Self {
        Self::with_rules(settings, Self::standard_rules())
    }

    pub fn with_rules(settings: VoteCasterSettings, rules: BTreeMap<KinematicPattern, PatternRule>) -> Self {
        Self { settings, rules }
    }

    pub fn standard_rules() -> BTreeMap<KinematicPattern, PatternRule> {
        use BodyPartLocation as L;
        use ImbalanceFamily::*;

        let rule = |family, muscles: &[BodyPartLocation]| PatternRule {
            family,
            muscles: muscles.to_vec(),
        };

        [
            (
                KinematicPattern::AptAnklePitch,
                rule(OveractiveShort, &[L::PSOAS, L::ILIACUS, L::ERECTOR_SPINAE]),
            ),
            (
                KinematicPattern::HipDropApt,
                rule(UnderactiveLong, &[L::GLUTEUS_MEDIUS_ANTERIOR, L::GLUTEUS_MEDIUS_POSTERIOR]),
            ),
            (
                KinematicPattern::HipDropPva,
                rule(UnderactiveShort, &[L::GLUTEUS_MEDIUS_POSTERIOR, L::GLUTEUS_MINIMUS]),
            ),
            (
                KinematicPattern::KneeValgusHipDrop,
                rule(
                    OveractiveShort,
                    &[L::ADDUCTOR_LONGUS, L::ADDUCTOR_BREVIS, L::TENSOR_FASCIA_LATAE],
                ),
            ),
            (
                KinematicPattern::KneeValgusPva,
                rule(UnderactiveLong, &[L::GLUTEUS_MAXIMUS, L::GLUTEUS_MEDIUS_POSTERIOR]),
            ),
            (
                KinematicPattern::KneeValgusApt,
                rule(OveractiveShort, &[L::TENSOR_FASCIA_LATAE, L::ADDUCTOR_MAGNUS_ANTERIOR]),
            ),
            (
                KinematicPattern::HipRotationAnklePitch,
                rule(OveractiveLong, &[L::PIRIFORMIS, L::QUADRATUS_FEMORIS]),
            ),
            (
                KinematicPattern::HipRotationApt,
                rule(UnderactiveShort, &[L::GLUTEUS_MAXIMUS]),
            ),
        ]
        .into_iter()
        .collect()
    }
}

impl VoteCaster for ElasticityVoteCaster {
    fn cast_votes(&self, session: &TrainingSessionSummary) -> Vec<Vote> {
        let Some(movement_patterns) = &session.movement_patterns else {
            return Vec::new();
        };

        let mut votes = Vec::new();
        for pattern in &movement_patterns.patterns {
            let Some(rule) = self.rules.get(&pattern.pattern) else {
                continue;
            };

            for (side, elasticity) in [(Side::Left, pattern.left), (Side::Right, pattern.right)] {
                let Some(elasticity) = elasticity else {
                    continue;
                };
                if elasticity.elasticity.abs() < self.settings.min_elasticity
                    || elasticity.y_adf > self.settings.max_drift
                {
                    continue;
                }

                for muscle in &rule.muscles {
                    let body_part = BodyPartSide::new(*muscle, side);
                    votes.push(Vote {
                        body_part,
                        kind: VoteKind::Family(rule.family),
                    });
                    if matches!(
                        rule.family,
                        ImbalanceFamily::UnderactiveShort | ImbalanceFamily::UnderactiveLong
                    ) {
                        votes.push(Vote {
                            body_part,
                            kind: VoteKind::Weak,
                        });
                    }
                }
            }
        }

        votes
    }
}

/// A family promoted on a date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Promotion {
    pub body_part: BodyPartSide,
    pub family: ImbalanceFamily,
}

/// Result of a daily promotion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImbalanceSummary {
    pub promotions: Vec<Promotion>,
    pub weak_promotions: usize,
}

pub struct ImbalanceVoteTracker {
    settings: ImbalanceSettings,
    long_window_days: i64,
}

impl ImbalanceVoteTracker {
    pub fn new(settings: ImbalanceSettings, long_window_days: u32) -> Self {
        Self {
            settings,
            long_window_days: i64::from(long_window_days),
        }
    }

    fn window_start(&self, date: NaiveDate) -> NaiveDate {
        date - Duration::days(self.long_window_days - 1)
    }

    /// Add the day's votes to the records
    ///
    /// A record that already took votes on `date` is left alone, so replaying
    /// a date does not count its votes twice. Votes last seen before the window
    /// are discarded first.
    pub fn apply_votes(
        &self,
        records: &mut BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
        votes: &[Vote],
        date: NaiveDate,
    ) -> usize {
        let mut by_body_part: BTreeMap<BodyPartSide, Vec<VoteKind>> = BTreeMap::new();
        for vote in votes {
            by_body_part.entry(vote.body_part).or_default().push(vote.kind);
        }

        let window_start = self.window_start(date);
        let mut applied = 0;
        for (body_part, kinds) in by_body_part {
            let record = records.entry(body_part).or_default();
            match record.last_vote_updated_date {
                Some(last) if last >= date => continue,
                Some(last) if last < window_start => clear_votes(record),
                _ => {}
            }

            for kind in kinds {
                match kind {
                    VoteKind::Family(family) => *family.vote_count_mut(record) += 1,
                    VoteKind::Weak => record.weak_vote_count += 1,
                }
                applied += 1;
            }
            record.last_vote_updated_date = Some(date);
        }

        applied
    }

    /// Promote at most one winning family per record, plus weak votes
    pub fn mark_anc_muscle_imbalance(
        &self,
        records: &mut BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
        date: NaiveDate,
    ) -> ImbalanceSummary {
        let window_start = self.window_start(date);

        for record in records.values_mut() {
            if record
                .last_vote_updated_date
                .map_or(false, |last| last < window_start)
            {
                clear_votes(record);
            }
            record.expire_stale_counts(window_start);
        }

        let mut global_totals: BTreeMap<ImbalanceFamily, u32> = BTreeMap::new();
        for record in records.values() {
            for family in ImbalanceFamily::PRECEDENCE {
                *global_totals.entry(family).or_insert(0) += family.vote_count(record);
            }
        }

        let mut summary = ImbalanceSummary::default();
        for (body_part, record) in records.iter_mut() {
            if let Some(family) = self.winning_family(record, &global_totals) {
                if record.record_promotion(family.promoted_state(), date, window_start) {
                    debug!(%body_part, ?family, "Muscle imbalance promoted");
                }
                record.last_muscle_imbalance_date = Some(date);
                summary.promotions.push(Promotion {
                    body_part: *body_part,
                    family,
                });
            }

            if record.weak_vote_count > 0 {
                record.record_promotion(PromotedState::Weak, date, window_start);
                summary.weak_promotions += 1;
            }
        }

        summary
    }

    fn winning_family(
        &self,
        record: &BodyPartInjuryRisk,
        global_totals: &BTreeMap<ImbalanceFamily, u32>,
    ) -> Option<ImbalanceFamily> {
        ImbalanceFamily::PRECEDENCE.into_iter().find(|family| {
            let votes = family.vote_count(record);
            if votes < self.settings.min_votes {
                return false;
            }

            let strict_max = ImbalanceFamily::PRECEDENCE
                .iter()
                .filter(|other| *other != family)
                .all(|other| votes > other.vote_count(record));
            if !strict_max {
                return false;
            }

            let global = global_totals.get(family).copied().unwrap_or(0);
            global > 0
                && Decimal::from(votes) * Decimal::from(100)
                    >= self.settings.min_global_share_percent * Decimal::from(global)
        })
    }
}

fn clear_votes(record: &mut BodyPartInjuryRisk) {
    record.overactive_short_vote_count = 0;
    record.overactive_long_vote_count = 0;
    record.underactive_short_vote_count = 0;
    record.underactive_long_vote_count = 0;
    record.weak_vote_count = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Elasticity, MovementPatterns, PatternElasticity, SessionType};
    use chrono::{TimeZone, Utc};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn tracker() -> ImbalanceVoteTracker {
        ImbalanceVoteTracker::new(ImbalanceSettings::default(), 20)
    }

    fn create_test_record(votes: [u32; 4]) -> BodyPartInjuryRisk {
        let mut record = BodyPartInjuryRisk::new();
        record.overactive_short_vote_count = votes[0];
        record.overactive_long_vote_count = votes[1];
        record.underactive_short_vote_count = votes[2];
        record.underactive_long_vote_count = votes[3];
        record.last_vote_updated_date = Some(date(10));
        record
    }

    fn key(location: BodyPartLocation) -> BodyPartSide {
        BodyPartSide::new(location, Side::Left)
    }

    #[test]
    fn test_exactly_one_family_promoted() {
        let mut records = BTreeMap::new();
        records.insert(key(BodyPartLocation::PSOAS), create_test_record([7, 5, 3, 1]));

        let summary = tracker().mark_anc_muscle_imbalance(&mut records, date(10));

        assert_eq!(
            summary.promotions,
            vec![Promotion {
                body_part: key(BodyPartLocation::PSOAS),
                family: ImbalanceFamily::OveractiveShort,
            }]
        );
        let record = &records[&key(BodyPartLocation::PSOAS)];
        assert_eq!(record.overactive_short_count_last_0_20_days, 1);
        assert_eq!(record.overactive_long_count_last_0_20_days, 0);
        assert_eq!(record.underactive_short_count_last_0_20_days, 0);
        assert_eq!(record.last_overactive_short_date, Some(date(10)));
        assert_eq!(record.last_muscle_imbalance_date, Some(date(10)));
    }

    #[test]
    fn test_ties_never_promote() {
        let mut records = BTreeMap::new();
        records.insert(key(BodyPartLocation::PSOAS), create_test_record([7, 7, 0, 0]));

        let summary = tracker().mark_anc_muscle_imbalance(&mut records, date(10));

        assert!(summary.promotions.is_empty());
        assert_eq!(records[&key(BodyPartLocation::PSOAS)].last_muscle_imbalance_date, None);
    }

    #[test]
    fn test_vote_gates() {
        let mut records = BTreeMap::new();
        // below the vote minimum
        records.insert(key(BodyPartLocation::ILIACUS), create_test_record([0, 5, 0, 0]));
        // wins locally but holds under 40% of the global overactive-short votes
        records.insert(key(BodyPartLocation::PSOAS), create_test_record([6, 0, 0, 0]));
        records.insert(key(BodyPartLocation::GLUTEUS_MAXIMUS), create_test_record([10, 11, 0, 0]));

        let summary = tracker().mark_anc_muscle_imbalance(&mut records, date(10));

        assert_eq!(
            summary.promotions,
            vec![Promotion {
                body_part: key(BodyPartLocation::GLUTEUS_MAXIMUS),
                family: ImbalanceFamily::OveractiveLong,
            }]
        );
    }

    #[test]
    fn test_weak_votes_promote_ungated_once_per_day() {
        let mut records = BTreeMap::new();
        let mut record = create_test_record([0, 0, 0, 0]);
        record.weak_vote_count = 1;
        records.insert(key(BodyPartLocation::GLUTEUS_MINIMUS), record);

        let tracker = tracker();
        tracker.mark_anc_muscle_imbalance(&mut records, date(10));
        let summary = tracker.mark_anc_muscle_imbalance(&mut records, date(10));

        assert_eq!(summary.weak_promotions, 1);
        let record = &records[&key(BodyPartLocation::GLUTEUS_MINIMUS)];
        assert_eq!(record.weak_count_last_0_20_days, 1);
        assert_eq!(record.last_weak_date, Some(date(10)));
    }

    #[test]
    fn test_apply_votes_once_per_day() {
        let votes = vec![
            Vote {
                body_part: key(BodyPartLocation::PSOAS),
                kind: VoteKind::Family(ImbalanceFamily::OveractiveShort),
            },
            Vote {
                body_part: key(BodyPartLocation::PSOAS),
                kind: VoteKind::Weak,
            },
        ];

        let tracker = tracker();
        let mut records = BTreeMap::new();
        assert_eq!(tracker.apply_votes(&mut records, &votes, date(1)), 2);
        assert_eq!(tracker.apply_votes(&mut records, &votes, date(1)), 0);
        assert_eq!(tracker.apply_votes(&mut records, &votes, date(2)), 2);

        let record = &records[&key(BodyPartLocation::PSOAS)];
        assert_eq!(record.overactive_short_vote_count, 2);
        assert_eq!(record.weak_vote_count, 2);
        assert_eq!(record.last_vote_updated_date, Some(date(2)));
    }

    #[test]
    fn test_stale_votes_and_counts_expire() {
        let mut records = BTreeMap::new();
        let mut record = create_test_record([7, 0, 0, 0]);
        record.last_vote_updated_date = Some(date(1));
        record.overactive_short_count_last_0_20_days = 2;
        record.last_overactive_short_date = Some(date(1));
        records.insert(key(BodyPartLocation::PSOAS), record);

        let summary = tracker().mark_anc_muscle_imbalance(&mut records, date(25));

        assert!(summary.promotions.is_empty());
        let record = &records[&key(BodyPartLocation::PSOAS)];
        assert_eq!(record.overactive_short_vote_count, 0);
        assert_eq!(record.overactive_short_count_last_0_20_days, 0);
    }

    #[test]
    fn test_elasticity_vote_caster() {
        let caster = ElasticityVoteCaster::new(VoteCasterSettings::default());
        let mut session = TrainingSessionSummary::new(
            "run",
            Utc.with_ymd_and_hms(2024, 10, 3, 6, 0, 0).unwrap(),
            SessionType::SportTraining,
        );
        assert!(caster.cast_votes(&session).is_empty());

        session.movement_patterns = Some(MovementPatterns {
            patterns: vec![
                PatternElasticity {
                    pattern: KinematicPattern::HipRotationApt,
                    left: Some(Elasticity {
                        elasticity: -0.4,
                        y_adf: -3.5,
                    }),
                    // drifting series does not vote
                    right: Some(Elasticity {
                        elasticity: 0.4,
                        y_adf: -1.0,
                    }),
                },
                PatternElasticity {
                    pattern: KinematicPattern::AptAnklePitch,
                    left: Some(Elasticity {
                        elasticity: 0.05,
                        y_adf: -4.0,
                    }),
                    right: None,
                },
            ],
        });

        let votes = caster.cast_votes(&session);
        let glute = key(BodyPartLocation::GLUTEUS_MAXIMUS);
        assert_eq!(
            votes,
            vec![
                Vote {
                    body_part: glute,
                    kind: VoteKind::Family(ImbalanceFamily::UnderactiveShort),
                },
                Vote {
                    body_part: glute,
                    kind: VoteKind::Weak,
                },
            ]
        );
    }
}
