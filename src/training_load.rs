//! Daily training load aggregation
//!
//! Every session of the processing date contributes load figures per
//! body-part-side. The figures are summed into the record's `*_today` fields
//! and compensation percentages are derived once the whole day is merged.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::injury_risk::BodyPartInjuryRisk;
use crate::models::{BodyPartLoad, BodyPartSide, TrainingSessionSummary};

/// What a daily merge touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub sessions: usize,
    pub body_parts_loaded: usize,
    pub compensating_body_parts: usize,
}

pub struct TrainingLoadAggregator;

impl TrainingLoadAggregator {
    /// Merge all of `date`'s sessions into the records
    pub fn merge_daily_sessions(
        records: &mut BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
        sessions: &[&TrainingSessionSummary],
        date: NaiveDate,
    ) -> LoadSummary {
        for record in records.values_mut() {
            record.reset_load_today();
        }

        let mut summary = LoadSummary::default();
        for session in sessions.iter().filter(|s| s.event_date() == date) {
            summary.sessions += 1;
            for load in &session.body_part_loads {
                let record = records.entry(load.body_part).or_default();
                Self::add_load(record, load, date);
            }
        }

        for record in records.values_mut() {
            record.update_compensation_percents();
            if record.total_volume_today().is_positive() {
                summary.body_parts_loaded += 1;
            }
            if record.last_compensation_date == Some(date) {
                summary.compensating_body_parts += 1;
            }
        }

        debug!(
            %date,
            sessions = summary.sessions,
            body_parts = summary.body_parts_loaded,
            "Merged daily sessions"
        );

        summary
    }

    fn add_load(record: &mut BodyPartInjuryRisk, load: &BodyPartLoad, date: NaiveDate) {
        record.concentric_volume_today += load.concentric_volume;
        record.eccentric_volume_today += load.eccentric_volume;
        record.isometric_volume_today += load.isometric_volume;
        record.concentric_intensity_today += load.concentric_intensity;
        record.eccentric_intensity_today += load.eccentric_intensity;
        record.isometric_intensity_today += load.isometric_intensity;
        record.compensating_concentric_volume_today += load.compensating_concentric_volume;
        record.compensating_eccentric_volume_today += load.compensating_eccentric_volume;

        if !load.compensating_causes.is_empty() {
            record
                .compensating_causes_volume_today
                .extend(load.compensating_causes.iter().copied());
            record.compensating_source_volume = record.compensating_source_volume.max(load.compensation_source);
            record.last_compensation_date = Some(date);
        }
    }
}
