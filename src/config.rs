use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::InjuryRiskError;
use crate::logging::LogConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Engine thresholds and windows
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Every tunable of the classification engine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub windows: WindowSettings,
    pub classification: ClassificationSettings,
    pub imbalance: ImbalanceSettings,
    pub relative_load: RelativeLoadSettings,
    pub vote_caster: VoteCasterSettings,
}

/// Rolling window lengths in days, counted inclusively back from the processing date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub short_window_days: u32,
    pub long_window_days: u32,
}

/// Symptom classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    /// Ache above this level is a spasm on its own
    pub spasm_ache_level: u8,

    /// Earlier 0-10 day ache reports needed to promote a low ache to spasm
    pub spasm_prior_ache_count: u32,

    /// 0-20 day knots/tight/sharp count marking muscle adhesions
    pub adhesions_count: u32,

    /// 0-20 day ache count marking muscle adhesions
    pub adhesions_ache_count: u32,

    /// 0-20 day ache count, all recent, inflaming a joint or ligament
    pub joint_inflammation_ache_count: u32,

    /// 0-20 day tight/sharp count marking joint or ligament dysfunction
    pub dysfunction_count: u32,

    pub ligament_dysfunction_ache_count: u32,
    pub joint_dysfunction_ache_count: u32,

    /// 0-20 day count at which mobility and weakness tiers become 1
    pub mobility_tier_count: u32,
}

/// Muscle imbalance vote promotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImbalanceSettings {
    pub min_votes: u32,

    /// Minimum share of the family's global vote total, in percent
    pub min_global_share_percent: Decimal,
}

/// Relative load level thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativeLoadSettings {
    /// Percent of max at or above which the level drops to 1
    pub high_percent_of_max: Decimal,

    /// Percent of max above which the level drops to 2
    pub moderate_percent_of_max: Decimal,

    pub high_rpe: Decimal,
    pub moderate_rpe: Decimal,
    pub ultra_high_intensity_high_rpe: Decimal,
    pub ultra_high_intensity_moderate_rpe: Decimal,
}

/// Thresholds turning pattern elasticity into imbalance votes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteCasterSettings {
    /// Smallest absolute elasticity that counts as a signal
    pub min_elasticity: f64,

    /// ADF statistic at or below which the pattern is considered stable
    pub max_drift: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            engine: EngineConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        WindowSettings {
            short_window_days: 10,
            long_window_days: 20,
        }
    }
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        ClassificationSettings {
            spasm_ache_level: 3,
            spasm_prior_ache_count: 2,
            adhesions_count: 3,
            adhesions_ache_count: 4,
            joint_inflammation_ache_count: 2,
            dysfunction_count: 3,
            ligament_dysfunction_ache_count: 3,
            joint_dysfunction_ache_count: 4,
            mobility_tier_count: 3,
        }
    }
}

impl Default for ImbalanceSettings {
    fn default() -> Self {
        ImbalanceSettings {
            min_votes: 6,
            min_global_share_percent: dec!(40),
        }
    }
}

impl Default for RelativeLoadSettings {
    fn default() -> Self {
        RelativeLoadSettings {
            high_percent_of_max: dec!(75),
            moderate_percent_of_max: dec!(50),
            high_rpe: dec!(7),
            moderate_rpe: dec!(5),
            ultra_high_intensity_high_rpe: dec!(5),
            ultra_high_intensity_moderate_rpe: dec!(3),
        }
    }
}

impl Default for VoteCasterSettings {
    fn default() -> Self {
        VoteCasterSettings {
            min_elasticity: 0.1,
            max_drift: -2.86,
        }
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> std::result::Result<(), InjuryRiskError> {
        let windows = &self.windows;
        if windows.short_window_days == 0 || windows.short_window_days > windows.long_window_days {
            return Err(InjuryRiskError::Configuration(format!(
                "short window ({} days) must be positive and no longer than the long window ({} days)",
                windows.short_window_days, windows.long_window_days
            )));
        }

        let load = &self.relative_load;
        if load.moderate_percent_of_max > load.high_percent_of_max
            || load.moderate_rpe > load.high_rpe
            || load.ultra_high_intensity_moderate_rpe > load.ultra_high_intensity_high_rpe
        {
            return Err(InjuryRiskError::Configuration(
                "moderate relative load thresholds must not exceed high thresholds".to_string(),
            ));
        }

        let share = self.imbalance.min_global_share_percent;
        if share < Decimal::ZERO || share > Decimal::from(100) {
            return Err(InjuryRiskError::Configuration(format!(
                "global vote share must be a percentage, got {}",
                share
            )));
        }

        Ok(())
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config
            .engine
            .validate()
            .with_context(|| format!("Invalid engine settings in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".injuryrs")
            .join("config.toml")
    }

    /// Load configuration from `path` (or the default location) with fallback to defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!(
                    "Ignoring unreadable config {}: {:#}",
                    config_path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<PathBuf> {
        let config_path = Self::default_config_path();
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }
}
