//! Same-day physiological state detection
//!
//! Runs after the symptom tracker on the reports dated on the processing date.
//! Muscles can become inflamed, spasm and develop adhesions. Joints and
//! ligaments can become inflamed and dysfunctional; a dysfunction marks every
//! anatomically related muscle with adhesions.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::anatomy::{AnatomyRegistry, TissueKind};
use crate::config::ClassificationSettings;
use crate::injury_risk::{BodyPartInjuryRisk, PromotedState};
use crate::models::{BodyPartSide, Side, SymptomDescriptor};
use crate::symptoms::{is_muscle_like, TrackedReport};

/// States detected on one processing date
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub inflammations: usize,
    pub muscle_spasms: usize,
    pub adhesions: usize,
    pub dysfunctions: usize,
    pub propagated_adhesions: usize,
}

/// Same-day reports for one body-part-side folded together
#[derive(Debug, Clone, Default)]
struct DailyReport {
    sharp: u8,
    ache: u8,
    tight: u8,
    knots: u8,
    newly_counted: Vec<SymptomDescriptor>,
    muscle_like: bool,
}

impl DailyReport {
    fn max_severity(&self) -> u8 {
        self.sharp.max(self.ache).max(self.tight).max(self.knots)
    }

    fn newly_counted(&self, descriptor: SymptomDescriptor) -> bool {
        self.newly_counted.contains(&descriptor)
    }
}

pub struct ClassificationRules<'a> {
    anatomy: &'a dyn AnatomyRegistry,
    settings: ClassificationSettings,
    long_window_days: i64,
}

impl<'a> ClassificationRules<'a> {
    pub fn new(
        anatomy: &'a dyn AnatomyRegistry,
        settings: ClassificationSettings,
        long_window_days: u32,
    ) -> Self {
        Self {
            anatomy,
            settings,
            long_window_days: i64::from(long_window_days),
        }
    }

    /// Classify every body-part-side reported on `date`
    pub fn classify(
        &self,
        records: &mut BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
        reports: &[TrackedReport],
        date: NaiveDate,
    ) -> ClassificationSummary {
        let mut summary = ClassificationSummary::default();
        let mut marks: BTreeMap<BodyPartSide, u8> = BTreeMap::new();

        for (body_part, report) in self.fold_reports(reports) {
            let record = records.entry(body_part).or_default();

            if report.muscle_like {
                self.classify_muscle(record, &report, date, &mut summary);
                continue;
            }

            match self.anatomy.tissue_kind(body_part.body_part_location) {
                Some(kind @ TissueKind::Joint) | Some(kind @ TissueKind::Ligament) => {
                    let fired = self.classify_joint_or_ligament(record, kind, &report, date, &mut summary);
                    if fired {
                        debug!(%body_part, ?kind, "Dysfunction marked");
                        self.collect_related_marks(body_part, report.max_severity(), &mut marks);
                    }
                }
                _ => {
                    debug!(%body_part, "No classification rules for location");
                }
            }
        }

        // Second phase: apply propagated marks, creating records as needed
        for (muscle, severity) in marks {
            let record = records.entry(muscle).or_default();
            record.last_adhesions_level = if record.last_adhesions_date == Some(date) {
                record.last_adhesions_level.max(severity)
            } else {
                severity
            };
            record.last_adhesions_date = Some(date);
            record.last_dysfunction_cause_date = Some(date);
            summary.propagated_adhesions += 1;
        }

        summary
    }

    fn fold_reports(&self, reports: &[TrackedReport]) -> BTreeMap<BodyPartSide, DailyReport> {
        let mut folded: BTreeMap<BodyPartSide, DailyReport> = BTreeMap::new();

        for tracked in reports {
            let event = &tracked.event;
            let daily = folded.entry(event.body_part_side()).or_default();
            daily.sharp = daily.sharp.max(event.severity(SymptomDescriptor::Sharp));
            daily.ache = daily.ache.max(event.severity(SymptomDescriptor::Ache));
            daily.tight = daily.tight.max(event.severity(SymptomDescriptor::Tight));
            daily.knots = daily.knots.max(event.severity(SymptomDescriptor::Knots));
            daily.newly_counted.extend(tracked.newly_counted.iter().copied());
            daily.muscle_like = is_muscle_like(self.anatomy, event);
        }

        folded
    }

    fn classify_muscle(
        &self,
        record: &mut BodyPartInjuryRisk,
        report: &DailyReport,
        date: NaiveDate,
        summary: &mut ClassificationSummary,
    ) {
        let settings = &self.settings;

        if (report.sharp > 0 && report.newly_counted(SymptomDescriptor::Sharp))
            || (report.ache > 0 && report.newly_counted(SymptomDescriptor::Ache))
        {
            record.last_inflammation_date = Some(date);
            record.last_inhibited_date = Some(date);
            summary.inflammations += 1;
        }

        let direct_spasm =
            report.sharp > 0 || report.tight > 0 || report.ache > settings.spasm_ache_level;
        let low_ache_spasm = report.ache > 0 && {
            // today's own report is already part of the 0-10 day count
            let earlier = record.ache_count_last_0_10_days.saturating_sub(1);
            earlier >= settings.spasm_prior_ache_count
        };
        if direct_spasm || low_ache_spasm {
            let severity = report.max_severity();
            record.last_muscle_spasm_level = if record.last_muscle_spasm_date == Some(date) {
                record.last_muscle_spasm_level.max(severity)
            } else {
                severity
            };
            record.last_muscle_spasm_date = Some(date);
            summary.muscle_spasms += 1;
        }

        let adhesions = record.knots_count_last_0_20_days >= settings.adhesions_count
            || record.tight_count_last_0_20_days >= settings.adhesions_count
            || record.sharp_count_last_0_20_days >= settings.adhesions_count
            || record.ache_count_last_0_20_days >= settings.adhesions_ache_count;
        if adhesions {
            let severity = report.max_severity();
            record.last_adhesions_level = if record.last_adhesions_date == Some(date) {
                record.last_adhesions_level.max(severity)
            } else {
                severity
            };
            record.last_adhesions_date = Some(date);

            let window_start = date - chrono::Duration::days(self.long_window_days - 1);
            record.record_promotion(PromotedState::Short, date, window_start);
            summary.adhesions += 1;
        }
    }

    /// Returns whether a dysfunction fired
    fn classify_joint_or_ligament(
        &self,
        record: &mut BodyPartInjuryRisk,
        kind: TissueKind,
        report: &DailyReport,
        date: NaiveDate,
        summary: &mut ClassificationSummary,
    ) -> bool {
        let settings = &self.settings;

        let all_recent_ache = record.ache_count_last_0_20_days >= settings.joint_inflammation_ache_count
            && record.ache_count_last_0_10_days == record.ache_count_last_0_20_days;
        if report.sharp > 0 || all_recent_ache {
            record.last_inflammation_date = Some(date);
            summary.inflammations += 1;
        }

        let ache_threshold = match kind {
            TissueKind::Ligament => settings.ligament_dysfunction_ache_count,
            _ => settings.joint_dysfunction_ache_count,
        };
        let dysfunction = record.tight_count_last_0_20_days >= settings.dysfunction_count
            || record.sharp_count_last_0_20_days >= settings.dysfunction_count
            || record.ache_count_last_0_20_days >= ache_threshold;
        if !dysfunction {
            return false;
        }

        match kind {
            TissueKind::Ligament if record.last_inflammation_date == Some(date) => {
                record.last_tendinopathy_date = Some(date);
            }
            TissueKind::Ligament => {
                record.last_tendinosis_date = Some(date);
            }
            _ => {
                record.last_altered_joint_arthrokinematics_date = Some(date);
            }
        }
        summary.dysfunctions += 1;
        true
    }

    fn collect_related_marks(
        &self,
        trigger: BodyPartSide,
        severity: u8,
        marks: &mut BTreeMap<BodyPartSide, u8>,
    ) {
        for muscle in self.anatomy.related_muscles(trigger.body_part_location) {
            let sides: &[Side] = if !self.anatomy.is_bilateral(*muscle) {
                &[Side::Combined]
            } else if trigger.side == Side::Combined {
                &Side::BILATERAL
            } else {
                std::slice::from_ref(&trigger.side)
            };

            for side in sides {
                marks
                    .entry(BodyPartSide::new(*muscle, *side))
                    .and_modify(|existing| *existing = (*existing).max(severity))
                    .or_insert(severity);
            }
        }
    }
}
