//! JSON input bundle for a replay run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::injury_risk::BodyPartInjuryRisk;
use crate::models::{BodyPartSide, LoadHistoryStats, SymptomEvent, TrainingSessionSummary};
use crate::processor::{from_entries, RiskEntry};

/// Everything a run reads: reports, sessions, load history and optional prior state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBundle {
    pub symptoms: Vec<SymptomEvent>,
    pub sessions: Vec<TrainingSessionSummary>,
    pub load_stats: LoadHistoryStats,
    pub previous_records: Option<Vec<RiskEntry>>,
}

impl InputBundle {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let bundle = Self::from_json(&content)?;
        debug!(
            path = %path.as_ref().display(),
            symptoms = bundle.symptoms.len(),
            sessions = bundle.sessions.len(),
            "Input bundle loaded"
        );
        Ok(bundle)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Prior state as a map, empty when none was supplied
    pub fn take_previous_records(&mut self) -> BTreeMap<BodyPartSide, BodyPartInjuryRisk> {
        self.previous_records.take().map(from_entries).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyPartLocation, SessionType, Side};
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BUNDLE: &str = r#"{
        "symptoms": [
            {
                "body_part": 7,
                "side": 1,
                "reported_date_time": "2025-03-02T08:15:00Z",
                "ache": 4
            }
        ],
        "sessions": [
            {
                "id": "practice-1",
                "event_date_time": "2025-03-02T17:00:00Z",
                "session_type": "practice",
                "session_rpe": "6",
                "body_part_loads": [
                    {
                        "body_part": { "body_part_location": 55, "side": 2 },
                        "eccentric_volume": { "lower_bound": "10", "observed_value": "12", "upper_bound": "14" }
                    }
                ]
            }
        ],
        "load_stats": {
            "high_relative_load_sessions": [ { "event_date": "2025-03-01" } ],
            "high_relative_load_score": "80"
        },
        "previous_records": [
            {
                "body_part": { "body_part_location": 7, "side": 1 },
                "injury_risk": { "tight_count_last_0_20_days": 2 }
            }
        ]
    }"#;

    #[test]
    fn test_parse_bundle() {
        let mut bundle = InputBundle::from_json(BUNDLE).unwrap();

        assert_eq!(bundle.symptoms.len(), 1);
        assert_eq!(bundle.symptoms[0].side, Side::Left);
        assert_eq!(bundle.symptoms[0].ache, Some(4));
        assert_eq!(bundle.symptoms[0].sharp, None);

        let session = &bundle.sessions[0];
        assert_eq!(session.session_type, SessionType::Practice);
        assert_eq!(session.session_rpe, Some(dec!(6)));
        assert_eq!(session.body_part_loads[0].eccentric_volume.observed_value, dec!(12));
        assert!(!session.body_part_loads[0].concentric_volume.is_positive());

        assert_eq!(bundle.load_stats.high_relative_load_score, dec!(80));
        assert_eq!(bundle.load_stats.high_relative_load_sessions[0].percent_of_max, None);

        let previous = bundle.take_previous_records();
        let key = BodyPartSide::new(BodyPartLocation(7), Side::Left);
        assert_eq!(previous[&key].tight_count_last_0_20_days, 2);
        assert!(bundle.previous_records.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(BUNDLE.as_bytes()).unwrap();

        let bundle = InputBundle::load_from_file(file.path()).unwrap();
        assert_eq!(bundle.sessions.len(), 1);
    }

    #[test]
    fn test_empty_bundle_and_bad_side() {
        let bundle = InputBundle::from_json("{}").unwrap();
        assert!(bundle.symptoms.is_empty());
        assert_eq!(bundle.load_stats.high_relative_load_score, dec!(50));

        let bad = r#"{ "symptoms": [ { "body_part": 7, "side": 4, "reported_date_time": "2025-03-02T08:15:00Z" } ] }"#;
        assert!(InputBundle::from_json(bad).is_err());
    }
}
