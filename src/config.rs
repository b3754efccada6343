//! Configuration
//!
//! Loaded from `.env`, an optional TOML file, then `SPORTS_PREDICTOR__*`
//! environment variables (e.g. `SPORTS_PREDICTOR__CALIBRATION__LOOKBACK_DAYS=14`).
//! Every section has defaults so an empty file is a valid configuration.

use crate::backtest::BacktestSettings;
use crate::calibration::CalibrationConfig;
use crate::elo::EloConfig;
use crate::error::{Error, Result};
use crate::model::{ModelRegistry, ModelSettings, MODEL_NAMES};
use crate::scheduler::SchedulerConfig;
use crate::scoring::ScoringConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub calibration: CalibrationConfig,
    pub backtest: BacktestSettings,
    pub elo: EloConfig,
    pub models: ModelsConfig,
    pub scoring: ScoringConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `~` is expanded
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.sports_predictor/store.db".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn expanded_path(&self) -> String {
        shellexpand::tilde(&self.path).into_owned()
    }
}

/// Which models run and the thresholds they share
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub enabled: Vec<String>,
    #[serde(flatten)]
    pub settings: ModelSettings,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            enabled: MODEL_NAMES.iter().map(|n| n.to_string()).collect(),
            settings: ModelSettings::default(),
        }
    }
}

impl ModelsConfig {
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::new(self.settings.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (if it exists) and the environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SPORTS_PREDICTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that name unknown models or cannot be run
    pub fn validate(&self) -> Result<()> {
        if self.models.enabled.is_empty() {
            return Err(Error::InvalidModelConfig("no models enabled".to_string()));
        }
        self.models.settings.validate()?;
        let registry = self.models.registry();
        registry.create_many(self.models.enabled.iter().map(String::as_str))?;
        self.backtest.validate()?;

        let calibration = &self.calibration;
        if calibration.lookback_days <= 0 {
            return Err(Error::InvalidModelConfig("lookback_days must be positive".to_string()));
        }
        if calibration.boost_curve.is_empty() || calibration.penalty_curve.is_empty() {
            return Err(Error::InvalidModelConfig("confidence curves need at least one point".to_string()));
        }
        Ok(())
    }
}
