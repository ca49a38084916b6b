use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::autoregulation::AutoregulationConfig;
use crate::error::LoadRsError;
use crate::hrv_trend::TrendConfig;
use crate::logging::LogConfig;
use crate::readiness::ReadinessConfig;
use crate::workload::WorkloadConfig;

/// Engine configuration, one section per component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// HRV trend analysis
    pub trend: TrendConfig,

    /// Composite readiness scoring
    pub readiness: ReadinessConfig,

    /// Acute/chronic workload monitoring
    pub workload: WorkloadConfig,

    /// Session and in-session load adjustment
    pub autoregulation: AutoregulationConfig,

    /// Cross-component safety limits
    pub safety: SafetyConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Limits applied when the workload monitor or overtraining markers raise a flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Highest adjustment factor allowed while a safety flag is raised
    pub flagged_adjustment_cap: f64,

    /// Cap the session when ACWR is in the danger zone
    pub cap_on_acwr_danger: bool,

    /// Cap the session when overtraining risk is high
    pub cap_on_overtraining: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        SafetyConfig {
            flagged_adjustment_cap: 0.85,
            cap_on_acwr_danger: true,
            cap_on_overtraining: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            metadata: ConfigMetadata::default(),
            trend: TrendConfig::default(),
            readiness: ReadinessConfig::default(),
            workload: WorkloadConfig::default(),
            autoregulation: AutoregulationConfig::default(),
            safety: SafetyConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path (~/.loadrs/config.toml)
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".loadrs")
            .join("config.toml")
    }

    /// Load configuration from the default path, falling back to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Could not load config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Reject settings that would make the components misbehave
    pub fn validate(&self) -> crate::error::Result<()> {
        let weights = &self.readiness.weights;
        let all_weights = [
            weights.hrv,
            weights.sleep_quality,
            weights.sleep_duration,
            weights.resting_hr,
            weights.subjective,
        ];
        // A zero weight would count an input as present while ignoring it
        if all_weights.iter().any(|w| *w <= 0.0 || !w.is_finite()) {
            return Err(LoadRsError::Configuration(
                "readiness weights must all be positive".to_string(),
            ));
        }

        if self.trend.min_samples < 2 {
            return Err(LoadRsError::Configuration(
                "trend.min_samples must be at least 2".to_string(),
            ));
        }

        let workload = &self.workload;
        if workload.acute_days == 0 || workload.acute_days > workload.chronic_days {
            return Err(LoadRsError::Configuration(format!(
                "workload windows invalid: acute {} days, chronic {} days",
                workload.acute_days, workload.chronic_days
            )));
        }
        if !(workload.safe_zone_low < workload.safe_zone_high
            && workload.safe_zone_high < workload.danger_threshold)
        {
            return Err(LoadRsError::Configuration(
                "workload zones must satisfy safe_zone_low < safe_zone_high < danger_threshold"
                    .to_string(),
            ));
        }

        if self.autoregulation.velocity_loss_threshold_pct <= 0.0 {
            return Err(LoadRsError::Configuration(
                "autoregulation.velocity_loss_threshold_pct must be positive".to_string(),
            ));
        }
        if self.autoregulation.min_rpe > self.autoregulation.max_rpe {
            return Err(LoadRsError::Configuration(
                "autoregulation.min_rpe exceeds max_rpe".to_string(),
            ));
        }

        if !(self.safety.flagged_adjustment_cap > 0.0 && self.safety.flagged_adjustment_cap <= 1.2)
        {
            return Err(LoadRsError::Configuration(
                "safety.flagged_adjustment_cap must be in (0, 1.2]".to_string(),
            ));
        }

        Ok(())
    }
}
