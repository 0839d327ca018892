//! Unified error hierarchy for injuryrs
//!
//! The engine itself never fails on well-formed input: missing body parts mean
//! "no prior history" and unknown locations are simply not expanded. Errors are
//! reserved for configuration/IO problems, dates that move backwards during a
//! replay, and broken counter/tier invariants.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::BodyPartSide;

/// Top-level error type for all injuryrs operations
#[derive(Debug, Error)]
pub enum InjuryRiskError {
    /// Malformed or inconsistent input data
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// A processing date earlier than the last committed one
    #[error("Out of order processing date {date}: already processed {last_processed}")]
    OutOfOrderDate {
        date: NaiveDate,
        last_processed: NaiveDate,
    },

    /// Counter or tier bounds broken after a processing step
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input validation errors
#[derive(Debug, Error)]
pub enum InputError {
    /// Severity outside the 0-10 scale
    #[error("Severity out of range for {descriptor}: {value}")]
    SeverityOutOfRange { descriptor: String, value: u8 },

    /// Date range where the start is after the end
    #[error("Invalid date range: {start} > {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Side value other than 0, 1 or 2
    #[error("Invalid side: {0}")]
    InvalidSide(u8),
}

/// A broken record invariant; always a defect in the increment/reset discipline
#[derive(Debug, Error)]
pub enum InvariantViolation {
    /// Short-window count exceeded its long-window count
    #[error("{body_part}: {descriptor} 0-10 day count {short} exceeds 0-20 day count {long}")]
    WindowOrder {
        body_part: BodyPartSide,
        descriptor: &'static str,
        short: u32,
        long: u32,
    },

    /// Tier outside its allowed range
    #[error("{body_part}: {tier} tier {value} exceeds maximum {max}")]
    TierOutOfRange {
        body_part: BodyPartSide,
        tier: &'static str,
        value: u8,
        max: u8,
    },
}

/// Result type alias for injuryrs operations
pub type Result<T> = std::result::Result<T, InjuryRiskError>;

impl InjuryRiskError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            InjuryRiskError::Input(_) => ErrorSeverity::Warning,
            InjuryRiskError::OutOfOrderDate { .. } => ErrorSeverity::Error,
            InjuryRiskError::Invariant(_) => ErrorSeverity::Critical,
            InjuryRiskError::Configuration(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            InjuryRiskError::OutOfOrderDate {
                date,
                last_processed,
            } => format!(
                "Cannot process {} after {}. Start a new run to replay earlier dates.",
                date, last_processed
            ),
            InjuryRiskError::Input(InputError::InvalidDateRange { start, end }) => {
                format!("The start date {} is after the end date {}.", start, end)
            }
            InjuryRiskError::Invariant(_) => {
                "Internal consistency check failed. Please report this issue.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Defect requiring immediate attention
    Critical,
    /// Error that prevents the operation
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}
