//! Day-by-day orchestration of the injury risk engine
//!
//! [`InjuryRiskProcessor`] owns the canonical body-part-side map for one run
//! together with the run inputs. Each processing date goes through the same
//! steps in order:
//!
//! 1. reject dates earlier than the last processed one
//! 2. rebuild rolling symptom counters
//! 3. classify the day's reports
//! 4. merge the day's session loads
//! 5. cast and promote muscle imbalance votes
//! 6. compute the relative load level
//! 7. rank tiers and mark excessive strain
//! 8. check record invariants
//!
//! Inputs are stably sorted by timestamp before any date is processed, so the
//! order in which they were added does not matter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn};

use crate::aggregation::{GroupAggregator, OutputView};
use crate::anatomy::AnatomyRegistry;
use crate::classification::{ClassificationRules, ClassificationSummary};
use crate::config::EngineConfig;
use crate::error::{InjuryRiskError, InputError, Result};
use crate::imbalance::{ElasticityVoteCaster, ImbalanceSummary, ImbalanceVoteTracker, VoteCaster};
use crate::injury_risk::BodyPartInjuryRisk;
use crate::models::{BodyPartSide, LoadHistoryStats, SymptomEvent, TrainingSessionSummary};
use crate::relative_load::{RelativeLoadCalculator, RelativeLoadLevel};
use crate::symptoms::{SymptomExpander, WindowedSymptomTracker};
use crate::tiers::{TierRanker, TierSummary};
use crate::training_load::{LoadSummary, TrainingLoadAggregator};

/// What happened on one processing date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub relative_load_level: RelativeLoadLevel,
    pub reports: usize,
    pub classification: ClassificationSummary,
    pub load: LoadSummary,
    pub votes_applied: usize,
    pub imbalance: ImbalanceSummary,
    pub tiers: TierSummary,
}

/// What happened over a replayed date range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DailySummary>,
    pub body_parts: usize,
}

impl ReplaySummary {
    pub fn total_promotions(&self) -> usize {
        self.days.iter().map(|d| d.imbalance.promotions.len()).sum()
    }

    pub fn total_dysfunctions(&self) -> usize {
        self.days.iter().map(|d| d.classification.dysfunctions).sum()
    }
}

/// One entry of a serialized risk map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub body_part: BodyPartSide,
    pub injury_risk: BodyPartInjuryRisk,
}

/// Flatten a risk map into serializable entries
pub fn to_entries(records: &BTreeMap<BodyPartSide, BodyPartInjuryRisk>) -> Vec<RiskEntry> {
    records
        .iter()
        .map(|(body_part, injury_risk)| RiskEntry {
            body_part: *body_part,
            injury_risk: injury_risk.clone(),
        })
        .collect()
}

/// Rebuild a risk map from entries; later duplicates merge into earlier ones
pub fn from_entries(entries: Vec<RiskEntry>) -> BTreeMap<BodyPartSide, BodyPartInjuryRisk> {
    let mut records: BTreeMap<BodyPartSide, BodyPartInjuryRisk> = BTreeMap::new();
    for entry in entries {
        let merged = match records.get(&entry.body_part) {
            Some(existing) => existing.merge(&entry.injury_risk),
            None => entry.injury_risk,
        };
        records.insert(entry.body_part, merged);
    }
    records
}

pub struct InjuryRiskProcessor<'a> {
    records: BTreeMap<BodyPartSide, BodyPartInjuryRisk>,
    symptoms: Vec<SymptomEvent>,
    sessions: Vec<TrainingSessionSummary>,
    load_stats: LoadHistoryStats,
    last_processed: Option<NaiveDate>,
    inputs_sorted: bool,

    expander: SymptomExpander<'a>,
    tracker: WindowedSymptomTracker,
    rules: ClassificationRules<'a>,
    imbalance: ImbalanceVoteTracker,
    vote_caster: Box<dyn VoteCaster + 'a>,
    relative_load: RelativeLoadCalculator,
    ranker: TierRanker,
    aggregator: GroupAggregator<'a>,
}

impl<'a> InjuryRiskProcessor<'a> {
    pub fn new(anatomy: &'a dyn AnatomyRegistry, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let long_window_days = config.windows.long_window_days;
        Ok(Self {
            records: BTreeMap::new(),
            symptoms: Vec::new(),
            sessions: Vec::new(),
            load_stats: LoadHistoryStats::default(),
            last_processed: None,
            inputs_sorted: true,

            expander: SymptomExpander::new(anatomy),
            tracker: WindowedSymptomTracker::new(&config.windows),
            rules: ClassificationRules::new(anatomy, config.classification.clone(), long_window_days),
            imbalance: ImbalanceVoteTracker::new(config.imbalance.clone(), long_window_days),
            vote_caster: Box::new(ElasticityVoteCaster::new(config.vote_caster.clone())),
            relative_load: RelativeLoadCalculator::new(config.relative_load.clone()),
            ranker: TierRanker::new(config.classification.mobility_tier_count),
            aggregator: GroupAggregator::new(anatomy),
        })
    }

    /// Resume from a previously persisted map
    ///
    /// Records persisted without dated history get one laid out from their
    /// counters, so the next processing date ages them instead of dropping them.
    pub fn with_records(mut self, mut records: BTreeMap<BodyPartSide, BodyPartInjuryRisk>) -> Self {
        for record in records.values_mut() {
            self.tracker.seed_history(record);
        }
        self.records = records;
        self
    }

    /// Replace the default elasticity-based vote caster
    pub fn with_vote_caster(mut self, vote_caster: Box<dyn VoteCaster + 'a>) -> Self {
        self.vote_caster = vote_caster;
        self
    }

    pub fn with_load_stats(mut self, load_stats: LoadHistoryStats) -> Self {
        self.load_stats = load_stats;
        self
    }

    /// Validate, expand and store symptom reports; returns the atomic event count
    pub fn add_symptoms(&mut self, events: &[SymptomEvent]) -> Result<usize> {
        for event in events {
            event.validate()?;
        }

        let expanded = self.expander.expand_all(events);
        let count = expanded.len();
        self.symptoms.extend(expanded);
        self.inputs_sorted = false;

        debug!(reports = events.len(), expanded = count, "Symptoms added");
        Ok(count)
    }

    pub fn add_sessions(&mut self, sessions: Vec<TrainingSessionSummary>) {
        self.sessions.extend(sessions);
        self.inputs_sorted = false;
    }

    pub fn records(&self) -> &BTreeMap<BodyPartSide, BodyPartInjuryRisk> {
        &self.records
    }

    pub fn record(&self, body_part: &BodyPartSide) -> Option<&BodyPartInjuryRisk> {
        self.records.get(body_part)
    }

    pub fn last_processed(&self) -> Option<NaiveDate> {
        self.last_processed
    }

    /// The map for the selected view
    pub fn output(&self, view: OutputView) -> BTreeMap<BodyPartSide, BodyPartInjuryRisk> {
        self.aggregator.aggregate_ird(&self.records, view)
    }

    /// Process every date from `start` to `end` inclusive
    pub fn process(&mut self, start: NaiveDate, end: NaiveDate) -> Result<ReplaySummary> {
        if start > end {
            return Err(InputError::InvalidDateRange { start, end }.into());
        }

        let span = info_span!("replay", %start, %end);
        let _enter = span.enter();

        let mut days = Vec::new();
        for date in start.iter_days().take_while(|date| *date <= end) {
            days.push(self.process_date(date)?);
        }

        let summary = ReplaySummary {
            start,
            end,
            days,
            body_parts: self.records.len(),
        };
        info!(
            days = summary.days.len(),
            body_parts = summary.body_parts,
            promotions = summary.total_promotions(),
            dysfunctions = summary.total_dysfunctions(),
            "Replay complete"
        );

        Ok(summary)
    }

    /// Process a single date
    ///
    /// Dates must not move backwards. Reprocessing the last processed date
    /// with the same inputs leaves every counter unchanged.
    pub fn process_date(&mut self, date: NaiveDate) -> Result<DailySummary> {
        if let Some(last_processed) = self.last_processed {
            if date < last_processed {
                return Err(InjuryRiskError::OutOfOrderDate {
                    date,
                    last_processed,
                });
            }
        }

        let span = info_span!("process_date", %date);
        let _enter = span.enter();

        self.sort_inputs();

        let reports = self.tracker.recompute(&mut self.records, &self.symptoms, date);
        let classification = self.rules.classify(&mut self.records, &reports, date);

        let day_sessions: Vec<&TrainingSessionSummary> = self
            .sessions
            .iter()
            .filter(|session| session.event_date() == date)
            .collect();
        let load = TrainingLoadAggregator::merge_daily_sessions(&mut self.records, &day_sessions, date);

        let votes: Vec<_> = day_sessions
            .iter()
            .flat_map(|session| self.vote_caster.cast_votes(session))
            .collect();
        let votes_applied = self.imbalance.apply_votes(&mut self.records, &votes, date);
        let imbalance = self.imbalance.mark_anc_muscle_imbalance(&mut self.records, date);

        let relative_load_level = self
            .relative_load
            .level_for_date(&day_sessions, &self.load_stats, date);

        let tiers = self
            .ranker
            .update_injury_risk_dict_rankings(&mut self.records, relative_load_level, date);

        self.check_invariants()?;
        self.last_processed = Some(date);

        let summary = DailySummary {
            date,
            relative_load_level,
            reports: reports.len(),
            classification,
            load,
            votes_applied,
            imbalance,
            tiers,
        };
        debug!(
            level = %summary.relative_load_level,
            reports = summary.reports,
            sessions = summary.load.sessions,
            "Date processed"
        );

        Ok(summary)
    }

    fn sort_inputs(&mut self) {
        if self.inputs_sorted {
            return;
        }
        self.symptoms.sort_by_key(|event| event.reported_date_time);
        self.sessions.sort_by_key(|session| session.event_date_time);
        self.inputs_sorted = true;
    }

    fn check_invariants(&self) -> Result<()> {
        for (body_part, record) in &self.records {
            if let Err(violation) = record.check_invariants(*body_part) {
                warn!(%violation, "Record invariant violated");
                return Err(violation.into());
            }
        }
        Ok(())
    }
}
