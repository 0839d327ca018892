//! Relative load level
//!
//! A coarse indicator of how hard the athlete trained on a date:
//!
//! - 1: high ambient load
//! - 2: moderate
//! - 3: low (the default)
//!
//! The level starts at 3 and is only ever lowered. Tier ranking uses it to
//! shift every quartile's tier.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RelativeLoadSettings;
use crate::models::{IntensityLevel, LoadHistoryStats, SessionType, TrainingSessionSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RelativeLoadLevel {
    High = 1,
    Moderate = 2,
    Low = 3,
}

impl RelativeLoadLevel {
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Keep the heavier of two levels
    pub fn lowered_to(self, other: RelativeLoadLevel) -> RelativeLoadLevel {
        self.min(other)
    }
}

impl Default for RelativeLoadLevel {
    fn default() -> Self {
        RelativeLoadLevel::Low
    }
}

impl From<RelativeLoadLevel> for u8 {
    fn from(level: RelativeLoadLevel) -> Self {
        level.value()
    }
}

impl TryFrom<u8> for RelativeLoadLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RelativeLoadLevel::High),
            2 => Ok(RelativeLoadLevel::Moderate),
            3 => Ok(RelativeLoadLevel::Low),
            other => Err(format!("Invalid relative load level: {}", other)),
        }
    }
}

impl fmt::Display for RelativeLoadLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Relative load level calculator
pub struct RelativeLoadCalculator {
    settings: RelativeLoadSettings,
}

impl RelativeLoadCalculator {
    pub fn new(settings: RelativeLoadSettings) -> Self {
        Self { settings }
    }

    /// Level for `date` from that day's sessions and load history
    pub fn level_for_date(
        &self,
        sessions: &[&TrainingSessionSummary],
        history: &LoadHistoryStats,
        date: NaiveDate,
    ) -> RelativeLoadLevel {
        let mut level = RelativeLoadLevel::Low;

        for session in sessions.iter().filter(|s| s.event_date() == date) {
            level = level.lowered_to(self.session_level(session));
        }

        for entry in history
            .high_relative_load_sessions
            .iter()
            .filter(|entry| entry.event_date == date)
        {
            let percent = entry
                .percent_of_max
                .unwrap_or(history.high_relative_load_score);
            level = level.lowered_to(self.percent_of_max_level(percent));
        }

        level
    }

    /// Level implied by a single session
    pub fn session_level(&self, session: &TrainingSessionSummary) -> RelativeLoadLevel {
        let mut level = RelativeLoadLevel::Low;

        if let Some(percent) = session.percent_of_max {
            level = level.lowered_to(self.percent_of_max_level(percent));
        }

        if let Some(rpe) = session.session_rpe {
            level = level.lowered_to(self.rpe_level(rpe, session.ultra_high_intensity));
        }

        if session.session_type == SessionType::MixedActivity || session.planned {
            for block in &session.intensity_blocks {
                let block_level = match block.intensity {
                    IntensityLevel::High => RelativeLoadLevel::High,
                    IntensityLevel::Moderate => RelativeLoadLevel::Moderate,
                    IntensityLevel::Low => RelativeLoadLevel::Low,
                };
                level = level.lowered_to(block_level);
            }
        }

        level
    }

    fn percent_of_max_level(&self, percent: Decimal) -> RelativeLoadLevel {
        if percent >= self.settings.high_percent_of_max {
            RelativeLoadLevel::High
        } else if percent > self.settings.moderate_percent_of_max {
            RelativeLoadLevel::Moderate
        } else {
            RelativeLoadLevel::Low
        }
    }

    fn rpe_level(&self, rpe: Decimal, ultra_high_intensity: bool) -> RelativeLoadLevel {
        let (high, moderate) = if ultra_high_intensity {
            (
                self.settings.ultra_high_intensity_high_rpe,
                self.settings.ultra_high_intensity_moderate_rpe,
            )
        } else {
            (self.settings.high_rpe, self.settings.moderate_rpe)
        };

        if rpe >= high {
            RelativeLoadLevel::High
        } else if rpe >= moderate {
            RelativeLoadLevel::Moderate
        } else {
            RelativeLoadLevel::Low
        }
    }
}

impl Default for RelativeLoadCalculator {
    fn default() -> Self {
        Self::new(RelativeLoadSettings::default())
    }
}
