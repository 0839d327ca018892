// Library interface for injuryrs modules
// This allows integration tests to access the core functionality

pub mod aggregation;
pub mod anatomy;
pub mod classification;
pub mod config;
pub mod error;
pub mod imbalance;
pub mod injury_risk;
pub mod input;
pub mod logging;
pub mod models;
pub mod processor;
pub mod relative_load;
pub mod symptoms;
pub mod tiers;
pub mod training_load;

// Re-export commonly used types for convenience
pub use models::*;
pub use aggregation::{GroupAggregator, OutputView};
pub use anatomy::{AnatomyRegistry, StaticAnatomy, TissueKind};
pub use config::{AppConfig, EngineConfig};
pub use error::{InjuryRiskError, InputError, InvariantViolation, Result};
pub use imbalance::{ElasticityVoteCaster, ImbalanceFamily, Vote, VoteCaster, VoteKind};
pub use injury_risk::{BodyPartInjuryRisk, DailyOccurrences, PromotedState};
pub use input::InputBundle;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use processor::{DailySummary, InjuryRiskProcessor, ReplaySummary, RiskEntry};
pub use relative_load::RelativeLoadLevel;
