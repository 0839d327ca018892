//! Symptom expansion and rolling-window tracking
//!
//! Group-level self-reports are first expanded into one event per constituent
//! muscle and side. The tracker folds the raw events into each record's dated
//! history, then rebuilds every reported-symptom counter from the dates inside
//! the window ending at the processing date. History persisted with a record
//! therefore keeps counting after a resume even when its events are gone.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::anatomy::{AnatomyRegistry, TissueKind};
use crate::config::WindowSettings;
use crate::injury_risk::BodyPartInjuryRisk;
use crate::models::{BodyPartSide, Side, SymptomDescriptor, SymptomEvent};

/// Expands group-level reports into atomic per-muscle events
pub struct SymptomExpander<'a> {
    anatomy: &'a dyn AnatomyRegistry,
}

impl<'a> SymptomExpander<'a> {
    pub fn new(anatomy: &'a dyn AnatomyRegistry) -> Self {
        Self { anatomy }
    }

    pub fn expand(&self, event: &SymptomEvent) -> Vec<SymptomEvent> {
        let location = event.body_part;
        let muscles = self.anatomy.group_muscles(location);

        if muscles.is_empty() {
            if self.anatomy.tissue_kind(location).is_none() {
                debug!(location = location.0, "Unknown location, keeping report as is");
            }
            return vec![event.clone()];
        }

        let sides: Vec<Side> = if event.side == Side::Combined && self.anatomy.is_bilateral(location) {
            Side::BILATERAL.to_vec()
        } else {
            vec![event.side]
        };

        muscles
            .iter()
            .flat_map(|muscle| {
                sides.iter().map(move |side| SymptomEvent {
                    body_part: *muscle,
                    side: *side,
                    ..event.clone()
                })
            })
            .collect()
    }

    pub fn expand_all(&self, events: &[SymptomEvent]) -> Vec<SymptomEvent> {
        events.iter().flat_map(|event| self.expand(event)).collect()
    }
}

/// A report dated on the processing date, after tracking
#[derive(Debug, Clone)]
pub struct TrackedReport {
    pub event: SymptomEvent,

    /// Descriptors this report incremented; same-day repeats are absent
    pub newly_counted: Vec<SymptomDescriptor>,
}

impl TrackedReport {
    pub fn is_newly_counted(&self, descriptor: SymptomDescriptor) -> bool {
        self.newly_counted.contains(&descriptor)
    }
}

pub struct WindowedSymptomTracker {
    short_window_days: i64,
    long_window_days: i64,
}

impl WindowedSymptomTracker {
    pub fn new(settings: &WindowSettings) -> Self {
        Self {
            short_window_days: i64::from(settings.short_window_days),
            long_window_days: i64::from(settings.long_window_days),
        }
    }

    /// First date inside the long window ending at `date`
    pub fn long_window_start(&self, date: NaiveDate) -> NaiveDate {
        date - Duration::days(self.long_window_days - 1)
    }

    /// First date inside the short window ending at `date`
    pub fn short_window_start(&self, date: NaiveDate) -> NaiveDate {
        date - Duration::days(self.short_window_days - 1)
    }

    /// Seed dated history for a resumed record persisted with counters only
    pub fn seed_history(&self, record: &mut BodyPartInjuryRisk) {
        record.seed_history_from_counts(self.short_window_days);
    }

    /// Rebuild every reported-symptom counter for `processing_date`
    ///
    /// `events` must be in chronological order. Events inside the long window
    /// join their record's dated history; history older than the window is
    /// dropped and the counters, dates and levels are derived from what is
    /// left. Returns the reports dated on `processing_date`.
    pub fn recompute(
        &self,
        records: &mut BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
        events: &[SymptomEvent],
        processing_date: NaiveDate,
    ) -> Vec<TrackedReport> {
        let window_start = self.long_window_start(processing_date);
        let mut counted_today: BTreeSet<(BodyPartSide, SymptomDescriptor)> = BTreeSet::new();
        let mut today = Vec::new();

        for event in events {
            let event_date = event.event_date();
            if event_date < window_start || event_date > processing_date {
                continue;
            }

            let body_part = event.body_part_side();
            let record = records.entry(body_part).or_default();
            for descriptor in SymptomDescriptor::ALL {
                let severity = event.severity(descriptor);
                if severity > 0 {
                    record.record_report(descriptor, event_date, severity);
                }
            }

            if event_date == processing_date {
                // a same-day repeat only raises the level
                let newly_counted = SymptomDescriptor::ALL
                    .into_iter()
                    .filter(|descriptor| {
                        event.severity(*descriptor) > 0 && counted_today.insert((body_part, *descriptor))
                    })
                    .collect();
                today.push(TrackedReport {
                    event: event.clone(),
                    newly_counted,
                });
            }
        }

        let short_window_start = self.short_window_start(processing_date);
        for record in records.values_mut() {
            record.refresh_reported_symptoms(short_window_start, window_start, processing_date);
        }

        today
    }
}

/// Whether a location is handled by the muscle rules
pub fn is_muscle_like(anatomy: &dyn AnatomyRegistry, event: &SymptomEvent) -> bool {
    matches!(
        anatomy.tissue_kind(event.body_part),
        Some(TissueKind::Muscle) | Some(TissueKind::MuscleGroup)
    )
}
