//! Per body-part-side injury risk record
//!
//! A [`BodyPartInjuryRisk`] carries four kinds of state:
//!
//! - rolling symptom and imbalance counters over 0-10 and 0-20 day windows,
//!   derived from the dated occurrences kept alongside them
//! - last-occurrence dates and last observed levels
//! - today's load figures as [`LoadRange`]s plus derived compensation percentages
//! - discrete tiers recomputed every processing date
//!
//! Records combine through [`BodyPartInjuryRisk::merge`], a pure function used
//! when rolling muscles up into groups.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::InvariantViolation;
use crate::models::{BodyPartSide, CompensationSource, LoadRange, SymptomDescriptor};

/// Highest value of a compensation or volume tier
pub const MAX_LOAD_TIER: u8 = 5;
/// Highest value of a mobility or weakness tier
pub const MAX_MOBILITY_TIER: u8 = 3;

/// Dates on which something was counted, with the highest level seen that day
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyOccurrences(BTreeMap<NaiveDate, u8>);

impl DailyOccurrences {
    /// `count` consecutive days ending at `last`, all at `level`
    pub fn consecutive(last: NaiveDate, count: u32, level: u8) -> Self {
        let mut days = BTreeMap::new();
        let mut date = Some(last);
        for _ in 0..count {
            let Some(day) = date else { break };
            days.insert(day, level);
            date = day.pred_opt();
        }
        Self(days)
    }

    /// Count `date` once; a repeat only raises its level. Returns whether the date was new.
    pub fn insert(&mut self, date: NaiveDate, level: u8) -> bool {
        match self.0.get_mut(&date) {
            Some(existing) => {
                *existing = (*existing).max(level);
                false
            }
            None => {
                self.0.insert(date, level);
                true
            }
        }
    }

    /// Drop every date before `window_start`
    pub fn expire(&mut self, window_start: NaiveDate) {
        self.0 = self.0.split_off(&window_start);
    }

    pub fn count_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        if from > to {
            return 0;
        }
        self.0.range(from..=to).count() as u32
    }

    /// Latest date not after `date`, with its level
    pub fn last_on_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, u8)> {
        self.0.range(..=date).next_back().map(|(day, level)| (*day, *level))
    }

    pub fn len(&self) -> u32 {
        self.0.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of both date sets, keeping the higher level on shared dates
    pub fn merge(&self, other: &DailyOccurrences) -> DailyOccurrences {
        let mut merged = self.clone();
        for (date, level) in &other.0 {
            merged.insert(*date, *level);
        }
        merged
    }
}

/// Confirmed 0-20 day states backed by dated promotions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotedState {
    Long,
    Short,
    OveractiveShort,
    OveractiveLong,
    UnderactiveShort,
    UnderactiveLong,
    Weak,
}

impl PromotedState {
    pub const ALL: [PromotedState; 7] = [
        PromotedState::Long,
        PromotedState::Short,
        PromotedState::OveractiveShort,
        PromotedState::OveractiveLong,
        PromotedState::UnderactiveShort,
        PromotedState::UnderactiveLong,
        PromotedState::Weak,
    ];
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyPartInjuryRisk {
    // rolling counters
    pub sharp_count_last_0_10_days: u32,
    pub sharp_count_last_0_20_days: u32,
    pub ache_count_last_0_10_days: u32,
    pub ache_count_last_0_20_days: u32,
    pub tight_count_last_0_20_days: u32,
    pub knots_count_last_0_20_days: u32,
    pub long_count_last_0_20_days: u32,
    pub short_count_last_0_20_days: u32,
    pub overactive_short_count_last_0_20_days: u32,
    pub overactive_long_count_last_0_20_days: u32,
    pub underactive_short_count_last_0_20_days: u32,
    pub underactive_long_count_last_0_20_days: u32,
    pub weak_count_last_0_20_days: u32,

    // dated evidence behind the counters
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub reported_history: BTreeMap<SymptomDescriptor, DailyOccurrences>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub promotion_history: BTreeMap<PromotedState, DailyOccurrences>,

    // provisional votes from movement analysis
    pub overactive_short_vote_count: u32,
    pub overactive_long_vote_count: u32,
    pub underactive_short_vote_count: u32,
    pub underactive_long_vote_count: u32,
    pub weak_vote_count: u32,
    pub last_vote_updated_date: Option<NaiveDate>,

    // reported symptoms
    pub last_sharp_date: Option<NaiveDate>,
    pub last_sharp_level: u8,
    pub last_ache_date: Option<NaiveDate>,
    pub last_ache_level: u8,
    pub last_tight_date: Option<NaiveDate>,
    pub last_tight_level: u8,
    pub last_knots_date: Option<NaiveDate>,
    pub last_knots_level: u8,

    // derived states
    pub last_inflammation_date: Option<NaiveDate>,
    pub last_muscle_spasm_date: Option<NaiveDate>,
    pub last_muscle_spasm_level: u8,
    pub last_adhesions_date: Option<NaiveDate>,
    pub last_adhesions_level: u8,
    pub last_inhibited_date: Option<NaiveDate>,
    pub last_long_date: Option<NaiveDate>,
    pub last_short_date: Option<NaiveDate>,
    pub last_overactive_short_date: Option<NaiveDate>,
    pub last_overactive_long_date: Option<NaiveDate>,
    pub last_underactive_short_date: Option<NaiveDate>,
    pub last_underactive_long_date: Option<NaiveDate>,
    pub last_weak_date: Option<NaiveDate>,
    pub last_muscle_imbalance_date: Option<NaiveDate>,
    pub last_tendinopathy_date: Option<NaiveDate>,
    pub last_tendinosis_date: Option<NaiveDate>,
    pub last_altered_joint_arthrokinematics_date: Option<NaiveDate>,
    pub last_compensation_date: Option<NaiveDate>,
    pub last_dysfunction_cause_date: Option<NaiveDate>,
    pub last_excessive_strain_date: Option<NaiveDate>,
    pub last_functional_overreaching_date: Option<NaiveDate>,
    pub last_non_functional_overreaching_date: Option<NaiveDate>,

    // today's load
    pub concentric_volume_today: LoadRange,
    pub eccentric_volume_today: LoadRange,
    pub isometric_volume_today: LoadRange,
    pub concentric_intensity_today: LoadRange,
    pub eccentric_intensity_today: LoadRange,
    pub isometric_intensity_today: LoadRange,
    pub compensating_concentric_volume_today: LoadRange,
    pub compensating_eccentric_volume_today: LoadRange,
    pub compensating_causes_volume_today: BTreeSet<BodyPartSide>,
    pub compensating_source_volume: Option<CompensationSource>,
    pub total_compensation_percent: Decimal,
    pub eccentric_compensation_percent: Decimal,

    // tiers
    pub total_volume_tier: u8,
    pub total_compensation_percent_tier: u8,
    pub eccentric_compensation_percent_tier: u8,
    pub eccentric_volume_tier: u8,
    pub limited_mobility_tier: u8,
    pub underactive_weak_tier: u8,
}

/// Mutable view over one reported descriptor's tracking fields
pub struct SymptomFields<'a> {
    pub last_date: &'a mut Option<NaiveDate>,
    pub last_level: &'a mut u8,
    pub count_0_20: &'a mut u32,
    pub count_0_10: Option<&'a mut u32>,
}

impl BodyPartInjuryRisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symptom_fields_mut(&mut self, descriptor: SymptomDescriptor) -> SymptomFields<'_> {
        match descriptor {
            SymptomDescriptor::Sharp => SymptomFields {
                last_date: &mut self.last_sharp_date,
                last_level: &mut self.last_sharp_level,
                count_0_20: &mut self.sharp_count_last_0_20_days,
                count_0_10: Some(&mut self.sharp_count_last_0_10_days),
            },
            SymptomDescriptor::Ache => SymptomFields {
                last_date: &mut self.last_ache_date,
                last_level: &mut self.last_ache_level,
                count_0_20: &mut self.ache_count_last_0_20_days,
                count_0_10: Some(&mut self.ache_count_last_0_10_days),
            },
            SymptomDescriptor::Tight => SymptomFields {
                last_date: &mut self.last_tight_date,
                last_level: &mut self.last_tight_level,
                count_0_20: &mut self.tight_count_last_0_20_days,
                count_0_10: None,
            },
            SymptomDescriptor::Knots => SymptomFields {
                last_date: &mut self.last_knots_date,
                last_level: &mut self.last_knots_level,
                count_0_20: &mut self.knots_count_last_0_20_days,
                count_0_10: None,
            },
        }
    }

    /// Count one report level for `descriptor` on `date`; returns whether the date was new
    pub fn record_report(&mut self, descriptor: SymptomDescriptor, date: NaiveDate, level: u8) -> bool {
        self.reported_history.entry(descriptor).or_default().insert(date, level)
    }

    /// Rebuild reported-symptom counters, dates and levels from the dated
    /// history as seen from `processing_date`
    pub fn refresh_reported_symptoms(
        &mut self,
        short_window_start: NaiveDate,
        long_window_start: NaiveDate,
        processing_date: NaiveDate,
    ) {
        for descriptor in SymptomDescriptor::ALL {
            let (count_0_20, count_0_10, last) = match self.reported_history.get_mut(&descriptor) {
                Some(history) => {
                    history.expire(long_window_start);
                    (
                        history.count_between(long_window_start, processing_date),
                        history.count_between(short_window_start, processing_date),
                        history.last_on_or_before(processing_date),
                    )
                }
                None => (0, 0, None),
            };

            let fields = self.symptom_fields_mut(descriptor);
            *fields.count_0_20 = count_0_20;
            if let Some(count) = fields.count_0_10 {
                *count = count_0_10;
            }
            *fields.last_date = last.map(|(date, _)| date);
            *fields.last_level = last.map_or(0, |(_, level)| level);
        }
        self.reported_history.retain(|_, history| !history.is_empty());
    }

    /// Lay out dated history for counters persisted without it
    ///
    /// Occurrences are placed on consecutive days ending at the last date: the
    /// 0-10 day share first, the rest just before the short window.
    pub fn seed_history_from_counts(&mut self, short_window_days: i64) {
        for descriptor in SymptomDescriptor::ALL {
            if self.reported_history.contains_key(&descriptor) {
                continue;
            }
            let fields = self.symptom_fields_mut(descriptor);
            let Some(last) = *fields.last_date else { continue };
            let level = *fields.last_level;
            let total = (*fields.count_0_20).max(1);
            let recent = fields
                .count_0_10
                .map_or(total, |count| (*count).clamp(1, total));

            let mut history = DailyOccurrences::consecutive(last, recent, level);
            if let Some(before_short_window) = last
                .checked_sub_signed(Duration::days(short_window_days))
                .filter(|_| total > recent)
            {
                history = history.merge(&DailyOccurrences::consecutive(before_short_window, total - recent, level));
            }
            self.reported_history.insert(descriptor, history);
        }

        for state in PromotedState::ALL {
            if self.promotion_history.contains_key(&state) {
                continue;
            }
            let (count, last_date) = self.promoted_fields_mut(state);
            let (count, last_date) = (*count, *last_date);
            if let Some(last) = last_date.filter(|_| count > 0) {
                self.promotion_history
                    .insert(state, DailyOccurrences::consecutive(last, count, 1));
            }
        }
    }

    /// Zero today's load figures and compensating causes
    pub fn reset_load_today(&mut self) {
        self.concentric_volume_today = LoadRange::ZERO;
        self.eccentric_volume_today = LoadRange::ZERO;
        self.isometric_volume_today = LoadRange::ZERO;
        self.concentric_intensity_today = LoadRange::ZERO;
        self.eccentric_intensity_today = LoadRange::ZERO;
        self.isometric_intensity_today = LoadRange::ZERO;
        self.compensating_concentric_volume_today = LoadRange::ZERO;
        self.compensating_eccentric_volume_today = LoadRange::ZERO;
        self.compensating_causes_volume_today.clear();
        self.compensating_source_volume = None;
        self.total_compensation_percent = Decimal::ZERO;
        self.eccentric_compensation_percent = Decimal::ZERO;
    }

    pub fn total_volume_today(&self) -> LoadRange {
        self.concentric_volume_today + self.eccentric_volume_today
    }

    pub fn total_compensating_volume_today(&self) -> LoadRange {
        self.compensating_concentric_volume_today + self.compensating_eccentric_volume_today
    }

    /// Recompute both compensation percentages from today's observed volumes
    pub fn update_compensation_percents(&mut self) {
        let hundred = Decimal::from(100);

        let total = self.total_volume_today().observed_value;
        self.total_compensation_percent = if total > Decimal::ZERO {
            self.total_compensating_volume_today().observed_value / total * hundred
        } else {
            Decimal::ZERO
        };

        let eccentric = self.eccentric_volume_today.observed_value;
        self.eccentric_compensation_percent = if eccentric > Decimal::ZERO {
            self.compensating_eccentric_volume_today.observed_value / eccentric * hundred
        } else {
            Decimal::ZERO
        };
    }

    /// Whether a joint or ligament dysfunction fired on, or was propagated to,
    /// this record on `date`
    pub fn dysfunction_on(&self, date: NaiveDate) -> bool {
        let today = Some(date);
        self.last_tendinopathy_date == today
            || self.last_tendinosis_date == today
            || self.last_altered_joint_arthrokinematics_date == today
            || self.last_dysfunction_cause_date == today
    }

    pub fn promoted_fields_mut(&mut self, state: PromotedState) -> (&mut u32, &mut Option<NaiveDate>) {
        match state {
            PromotedState::Long => (&mut self.long_count_last_0_20_days, &mut self.last_long_date),
            PromotedState::Short => (&mut self.short_count_last_0_20_days, &mut self.last_short_date),
            PromotedState::OveractiveShort => (
                &mut self.overactive_short_count_last_0_20_days,
                &mut self.last_overactive_short_date,
            ),
            PromotedState::OveractiveLong => (
                &mut self.overactive_long_count_last_0_20_days,
                &mut self.last_overactive_long_date,
            ),
            PromotedState::UnderactiveShort => (
                &mut self.underactive_short_count_last_0_20_days,
                &mut self.last_underactive_short_date,
            ),
            PromotedState::UnderactiveLong => (
                &mut self.underactive_long_count_last_0_20_days,
                &mut self.last_underactive_long_date,
            ),
            PromotedState::Weak => (&mut self.weak_count_last_0_20_days, &mut self.last_weak_date),
        }
    }

    /// Count a promotion on `date`, at most once per day
    ///
    /// Promotions older than `window_start` are dropped and the count is the
    /// number of promotion dates left. Returns whether `date` was new.
    pub fn record_promotion(&mut self, state: PromotedState, date: NaiveDate, window_start: NaiveDate) -> bool {
        let history = self.promotion_history.entry(state).or_default();
        let added = history.insert(date, 1);
        history.expire(window_start);
        let in_window = history.count_between(window_start, date);

        let (count, last_date) = self.promoted_fields_mut(state);
        *count = in_window;
        *last_date = (*last_date).max(Some(date));
        added
    }

    /// Drop promotions older than `window_start` and recount what remains
    pub fn expire_stale_counts(&mut self, window_start: NaiveDate) {
        for state in PromotedState::ALL {
            let remaining = self.promotion_history.get_mut(&state).map_or(0, |history| {
                history.expire(window_start);
                history.len()
            });
            *self.promoted_fields_mut(state).0 = remaining;
        }
        self.promotion_history.retain(|_, history| !history.is_empty());
    }

    pub fn has_votes(&self) -> bool {
        self.overactive_short_vote_count > 0
            || self.overactive_long_vote_count > 0
            || self.underactive_short_vote_count > 0
            || self.underactive_long_vote_count > 0
            || self.weak_vote_count > 0
    }

    /// Combine two records into a new one
    ///
    /// Counters and load ranges add, dates keep the later value, levels keep the
    /// higher value, tiers keep the more severe (smallest positive) value and
    /// compensating causes and dated histories are united. Of two compensation
    /// sources the greater one wins. Percentages are recomputed from the
    /// merged volumes. Neither input is modified.
    pub fn merge(&self, other: &BodyPartInjuryRisk) -> BodyPartInjuryRisk {
        let mut compensating_causes_volume_today = self.compensating_causes_volume_today.clone();
        compensating_causes_volume_today.extend(other.compensating_causes_volume_today.iter().copied());

        let mut merged = BodyPartInjuryRisk {
            sharp_count_last_0_10_days: self.sharp_count_last_0_10_days + other.sharp_count_last_0_10_days,
            sharp_count_last_0_20_days: self.sharp_count_last_0_20_days + other.sharp_count_last_0_20_days,
            ache_count_last_0_10_days: self.ache_count_last_0_10_days + other.ache_count_last_0_10_days,
            ache_count_last_0_20_days: self.ache_count_last_0_20_days + other.ache_count_last_0_20_days,
            tight_count_last_0_20_days: self.tight_count_last_0_20_days + other.tight_count_last_0_20_days,
            knots_count_last_0_20_days: self.knots_count_last_0_20_days + other.knots_count_last_0_20_days,
            long_count_last_0_20_days: self.long_count_last_0_20_days + other.long_count_last_0_20_days,
            short_count_last_0_20_days: self.short_count_last_0_20_days + other.short_count_last_0_20_days,
            overactive_short_count_last_0_20_days: self.overactive_short_count_last_0_20_days
                + other.overactive_short_count_last_0_20_days,
            overactive_long_count_last_0_20_days: self.overactive_long_count_last_0_20_days
                + other.overactive_long_count_last_0_20_days,
            underactive_short_count_last_0_20_days: self.underactive_short_count_last_0_20_days
                + other.underactive_short_count_last_0_20_days,
            underactive_long_count_last_0_20_days: self.underactive_long_count_last_0_20_days
                + other.underactive_long_count_last_0_20_days,
            weak_count_last_0_20_days: self.weak_count_last_0_20_days + other.weak_count_last_0_20_days,

            reported_history: merge_histories(&self.reported_history, &other.reported_history),
            promotion_history: merge_histories(&self.promotion_history, &other.promotion_history),

            overactive_short_vote_count: self.overactive_short_vote_count + other.overactive_short_vote_count,
            overactive_long_vote_count: self.overactive_long_vote_count + other.overactive_long_vote_count,
            underactive_short_vote_count: self.underactive_short_vote_count
                + other.underactive_short_vote_count,
            underactive_long_vote_count: self.underactive_long_vote_count + other.underactive_long_vote_count,
            weak_vote_count: self.weak_vote_count + other.weak_vote_count,
            last_vote_updated_date: self.last_vote_updated_date.max(other.last_vote_updated_date),

            last_sharp_date: self.last_sharp_date.max(other.last_sharp_date),
            last_sharp_level: self.last_sharp_level.max(other.last_sharp_level),
            last_ache_date: self.last_ache_date.max(other.last_ache_date),
            last_ache_level: self.last_ache_level.max(other.last_ache_level),
            last_tight_date: self.last_tight_date.max(other.last_tight_date),
            last_tight_level: self.last_tight_level.max(other.last_tight_level),
            last_knots_date: self.last_knots_date.max(other.last_knots_date),
            last_knots_level: self.last_knots_level.max(other.last_knots_level),

            last_inflammation_date: self.last_inflammation_date.max(other.last_inflammation_date),
            last_muscle_spasm_date: self.last_muscle_spasm_date.max(other.last_muscle_spasm_date),
            last_muscle_spasm_level: self.last_muscle_spasm_level.max(other.last_muscle_spasm_level),
            last_adhesions_date: self.last_adhesions_date.max(other.last_adhesions_date),
            last_adhesions_level: self.last_adhesions_level.max(other.last_adhesions_level),
            last_inhibited_date: self.last_inhibited_date.max(other.last_inhibited_date),
            last_long_date: self.last_long_date.max(other.last_long_date),
            last_short_date: self.last_short_date.max(other.last_short_date),
            last_overactive_short_date: self.last_overactive_short_date.max(other.last_overactive_short_date),
            last_overactive_long_date: self.last_overactive_long_date.max(other.last_overactive_long_date),
            last_underactive_short_date: self
                .last_underactive_short_date
                .max(other.last_underactive_short_date),
            last_underactive_long_date: self.last_underactive_long_date.max(other.last_underactive_long_date),
            last_weak_date: self.last_weak_date.max(other.last_weak_date),
            last_muscle_imbalance_date: self.last_muscle_imbalance_date.max(other.last_muscle_imbalance_date),
            last_tendinopathy_date: self.last_tendinopathy_date.max(other.last_tendinopathy_date),
            last_tendinosis_date: self.last_tendinosis_date.max(other.last_tendinosis_date),
            last_altered_joint_arthrokinematics_date: self
                .last_altered_joint_arthrokinematics_date
                .max(other.last_altered_joint_arthrokinematics_date),
            last_compensation_date: self.last_compensation_date.max(other.last_compensation_date),
            last_dysfunction_cause_date: self.last_dysfunction_cause_date.max(other.last_dysfunction_cause_date),
            last_excessive_strain_date: self.last_excessive_strain_date.max(other.last_excessive_strain_date),
            last_functional_overreaching_date: self
                .last_functional_overreaching_date
                .max(other.last_functional_overreaching_date),
            last_non_functional_overreaching_date: self
                .last_non_functional_overreaching_date
                .max(other.last_non_functional_overreaching_date),

            concentric_volume_today: self.concentric_volume_today + other.concentric_volume_today,
            eccentric_volume_today: self.eccentric_volume_today + other.eccentric_volume_today,
            isometric_volume_today: self.isometric_volume_today + other.isometric_volume_today,
            concentric_intensity_today: self.concentric_intensity_today + other.concentric_intensity_today,
            eccentric_intensity_today: self.eccentric_intensity_today + other.eccentric_intensity_today,
            isometric_intensity_today: self.isometric_intensity_today + other.isometric_intensity_today,
            compensating_concentric_volume_today: self.compensating_concentric_volume_today
                + other.compensating_concentric_volume_today,
            compensating_eccentric_volume_today: self.compensating_eccentric_volume_today
                + other.compensating_eccentric_volume_today,
            compensating_causes_volume_today,
            compensating_source_volume: self.compensating_source_volume.max(other.compensating_source_volume),
            total_compensation_percent: Decimal::ZERO,
            eccentric_compensation_percent: Decimal::ZERO,

            total_volume_tier: merge_tiers(self.total_volume_tier, other.total_volume_tier),
            total_compensation_percent_tier: merge_tiers(
                self.total_compensation_percent_tier,
                other.total_compensation_percent_tier,
            ),
            eccentric_compensation_percent_tier: merge_tiers(
                self.eccentric_compensation_percent_tier,
                other.eccentric_compensation_percent_tier,
            ),
            eccentric_volume_tier: merge_tiers(self.eccentric_volume_tier, other.eccentric_volume_tier),
            limited_mobility_tier: merge_tiers(self.limited_mobility_tier, other.limited_mobility_tier),
            underactive_weak_tier: merge_tiers(self.underactive_weak_tier, other.underactive_weak_tier),
        };
        merged.update_compensation_percents();
        merged
    }

    /// Check counter and tier bounds
    pub fn check_invariants(&self, body_part: BodyPartSide) -> Result<(), InvariantViolation> {
        let windows = [
            ("sharp", self.sharp_count_last_0_10_days, self.sharp_count_last_0_20_days),
            ("ache", self.ache_count_last_0_10_days, self.ache_count_last_0_20_days),
        ];
        for (descriptor, short, long) in windows {
            if short > long {
                return Err(InvariantViolation::WindowOrder {
                    body_part,
                    descriptor,
                    short,
                    long,
                });
            }
        }

        let tiers = [
            ("total_volume", self.total_volume_tier, MAX_LOAD_TIER),
            ("total_compensation_percent", self.total_compensation_percent_tier, MAX_LOAD_TIER),
            (
                "eccentric_compensation_percent",
                self.eccentric_compensation_percent_tier,
                MAX_LOAD_TIER,
            ),
            ("eccentric_volume", self.eccentric_volume_tier, MAX_LOAD_TIER),
            ("limited_mobility", self.limited_mobility_tier, MAX_MOBILITY_TIER),
            ("underactive_weak", self.underactive_weak_tier, MAX_MOBILITY_TIER),
        ];
        for (tier, value, max) in tiers {
            if value > max {
                return Err(InvariantViolation::TierOutOfRange {
                    body_part,
                    tier,
                    value,
                    max,
                });
            }
        }

        Ok(())
    }
}

fn merge_histories<K: Ord + Copy>(
    a: &BTreeMap<K, DailyOccurrences>,
    b: &BTreeMap<K, DailyOccurrences>,
) -> BTreeMap<K, DailyOccurrences> {
    let mut merged = a.clone();
    for (key, history) in b {
        let combined = merged.get(key).map_or_else(|| history.clone(), |existing| existing.merge(history));
        merged.insert(*key, combined);
    }
    merged
}

/// More severe of two tiers: the smallest positive value, 0 meaning no tier
pub fn merge_tiers(a: u8, b: u8) -> u8 {
    match (a, b) {
        (0, b) => b,
        (a, 0) => a,
        (a, b) => a.min(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyPartLocation, Side};
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn create_test_record() -> BodyPartInjuryRisk {
        let mut record = BodyPartInjuryRisk::new();
        record.ache_count_last_0_10_days = 1;
        record.ache_count_last_0_20_days = 2;
        record.last_ache_date = Some(date(3));
        record.last_ache_level = 4;
        record.concentric_volume_today = LoadRange::exact(dec!(60));
        record.eccentric_volume_today = LoadRange::exact(dec!(40));
        record.compensating_eccentric_volume_today = LoadRange::exact(dec!(10));
        record.total_volume_tier = 3;
        record
    }

    #[test]
    fn test_merge_tiers() {
        assert_eq!(merge_tiers(0, 0), 0);
        assert_eq!(merge_tiers(0, 4), 4);
        assert_eq!(merge_tiers(2, 0), 2);
        assert_eq!(merge_tiers(2, 5), 2);
    }

    #[test]
    fn test_compensation_percents() {
        let mut record = create_test_record();
        record.update_compensation_percents();

        assert_eq!(record.total_compensation_percent, dec!(10));
        assert_eq!(record.eccentric_compensation_percent, dec!(25));

        record.reset_load_today();
        record.update_compensation_percents();
        assert_eq!(record.total_compensation_percent, Decimal::ZERO);
        assert!(!record.total_volume_today().is_positive());
    }

    #[test]
    fn test_merge_is_pure_and_additive() {
        let a = create_test_record();
        let mut b = BodyPartInjuryRisk::new();
        b.ache_count_last_0_20_days = 1;
        b.last_ache_date = Some(date(5));
        b.last_ache_level = 2;
        b.total_volume_tier = 1;
        b.eccentric_volume_today = LoadRange::exact(dec!(40));
        b.compensating_causes_volume_today
            .insert(BodyPartSide::new(BodyPartLocation::GLUTEUS_MAXIMUS, Side::Left));

        let merged = a.merge(&b);

        assert_eq!(merged.ache_count_last_0_20_days, 3);
        assert_eq!(merged.ache_count_last_0_10_days, 1);
        assert_eq!(merged.last_ache_date, Some(date(5)));
        assert_eq!(merged.last_ache_level, 4);
        assert_eq!(merged.total_volume_tier, 1);
        assert_eq!(merged.eccentric_volume_today.observed_value, dec!(80));
        assert_eq!(merged.eccentric_compensation_percent, dec!(12.5));
        assert_eq!(merged.compensating_causes_volume_today.len(), 1);

        // inputs untouched
        assert_eq!(a, create_test_record());
        assert_eq!(b.ache_count_last_0_20_days, 1);
    }

    #[test]
    fn test_reported_symptoms_follow_history() {
        let mut record = create_test_record();
        record.last_muscle_spasm_date = Some(date(3));
        record.record_report(SymptomDescriptor::Ache, date(3), 4);
        assert!(!record.record_report(SymptomDescriptor::Ache, date(3), 6));
        record.record_report(SymptomDescriptor::Ache, date(12), 2);

        record.refresh_reported_symptoms(date(5), date(1), date(14));
        assert_eq!(record.ache_count_last_0_20_days, 2);
        assert_eq!(record.ache_count_last_0_10_days, 1);
        assert_eq!(record.last_ache_date, Some(date(12)));
        assert_eq!(record.last_ache_level, 2);

        // viewed from day 3 the later report does not exist yet
        record.refresh_reported_symptoms(date(1), date(1), date(3));
        assert_eq!(record.ache_count_last_0_20_days, 1);
        assert_eq!(record.last_ache_level, 6);

        record.refresh_reported_symptoms(date(20), date(20), date(30));
        assert_eq!(record.ache_count_last_0_20_days, 0);
        assert_eq!(record.last_ache_date, None);
        assert_eq!(record.last_ache_level, 0);
        assert!(record.reported_history.is_empty());
        // derived states survive
        assert_eq!(record.last_muscle_spasm_date, Some(date(3)));
    }

    #[test]
    fn test_seed_history_from_counts() {
        let mut record = BodyPartInjuryRisk::new();
        record.ache_count_last_0_20_days = 3;
        record.ache_count_last_0_10_days = 1;
        record.last_ache_date = Some(date(15));
        record.last_ache_level = 3;
        record.weak_count_last_0_20_days = 2;
        record.last_weak_date = Some(date(15));

        record.seed_history_from_counts(10);
        record.refresh_reported_symptoms(date(7), date(1), date(16));

        assert_eq!(record.ache_count_last_0_20_days, 3);
        assert_eq!(record.ache_count_last_0_10_days, 1);
        assert_eq!(record.last_ache_date, Some(date(15)));
        assert_eq!(record.last_ache_level, 3);

        record.expire_stale_counts(date(1));
        assert_eq!(record.weak_count_last_0_20_days, 2);
        record.expire_stale_counts(date(15));
        assert_eq!(record.weak_count_last_0_20_days, 1);
    }

    #[test]
    fn test_invariant_checks() {
        let key = BodyPartSide::new(BodyPartLocation::SOLEUS, Side::Right);
        let mut record = create_test_record();
        assert!(record.check_invariants(key).is_ok());

        record.ache_count_last_0_10_days = 3;
        assert!(matches!(
            record.check_invariants(key),
            Err(InvariantViolation::WindowOrder { descriptor: "ache", .. })
        ));

        record.ache_count_last_0_10_days = 0;
        record.limited_mobility_tier = 4;
        assert!(matches!(
            record.check_invariants(key),
            Err(InvariantViolation::TierOutOfRange { tier: "limited_mobility", .. })
        ));
    }

    #[test]
    fn test_record_promotion_once_per_day() {
        let mut record = BodyPartInjuryRisk::new();

        assert!(record.record_promotion(PromotedState::Short, date(10), date(1)));
        assert!(!record.record_promotion(PromotedState::Short, date(10), date(1)));
        assert!(record.record_promotion(PromotedState::Short, date(11), date(1)));
        assert_eq!(record.short_count_last_0_20_days, 2);

        // both earlier promotions are outside the window
        assert!(record.record_promotion(PromotedState::Short, date(30), date(11) + Duration::days(1)));
        assert_eq!(record.short_count_last_0_20_days, 1);
        assert_eq!(record.last_short_date, Some(date(30)));
    }

    #[test]
    fn test_promoted_count_never_exceeds_window() {
        let mut record = BodyPartInjuryRisk::new();
        for day in 1..=30 {
            let window_start = date(day) - Duration::days(19);
            record.expire_stale_counts(window_start);
            record.record_promotion(PromotedState::Weak, date(day), window_start);
            assert!(record.weak_count_last_0_20_days <= 20);
        }

        assert_eq!(record.weak_count_last_0_20_days, 20);
        assert_eq!(record.last_weak_date, Some(date(30)));
    }

    #[test]
    fn test_expire_stale_counts() {
        let mut record = BodyPartInjuryRisk::new();
        record.record_promotion(PromotedState::Short, date(2), date(1));
        record.record_promotion(PromotedState::Weak, date(20), date(1));
        // a count with no dated promotions behind it does not survive
        record.overactive_long_count_last_0_20_days = 3;

        record.expire_stale_counts(date(5));

        assert_eq!(record.short_count_last_0_20_days, 0);
        assert_eq!(record.last_short_date, Some(date(2)));
        assert_eq!(record.weak_count_last_0_20_days, 1);
        assert_eq!(record.overactive_long_count_last_0_20_days, 0);
        assert!(!record.promotion_history.contains_key(&PromotedState::Short));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut a = create_test_record();
        a.compensating_source_volume = Some(CompensationSource::InternalProcessing);
        a.record_report(SymptomDescriptor::Ache, date(3), 4);
        a.record_promotion(PromotedState::Weak, date(4), date(1));

        let mut b = BodyPartInjuryRisk::new();
        b.compensating_source_volume = Some(CompensationSource::MovementPatterns);
        b.record_report(SymptomDescriptor::Ache, date(3), 6);
        b.record_report(SymptomDescriptor::Tight, date(5), 2);

        let merged = a.merge(&b);
        assert_eq!(merged, b.merge(&a));
        assert_eq!(
            merged.compensating_source_volume,
            Some(CompensationSource::MovementPatterns)
        );
        assert_eq!(merged.reported_history[&SymptomDescriptor::Ache].len(), 1);
        assert_eq!(
            merged.reported_history[&SymptomDescriptor::Ache].last_on_or_before(date(9)),
            Some((date(3), 6))
        );
        assert!(merged.promotion_history.contains_key(&PromotedState::Weak));
    }

    #[test]
    fn test_daily_occurrences_layout() {
        let run = DailyOccurrences::consecutive(date(10), 3, 2);
        assert_eq!(run.len(), 3);
        assert_eq!(run.count_between(date(8), date(10)), 3);
        assert_eq!(run.count_between(date(10), date(8)), 0);

        let mut expired = run.clone();
        expired.expire(date(10));
        assert_eq!(expired.len(), 1);
    }

    #[test]
    fn test_dysfunction_on() {
        let mut record = BodyPartInjuryRisk::new();
        assert!(!record.dysfunction_on(date(3)));

        record.last_dysfunction_cause_date = Some(date(3));
        assert!(record.dysfunction_on(date(3)));
        assert!(!record.dysfunction_on(date(4)));
    }
}
