//! Backtest engine
//!
//! Replays completed games through a configurable weighted set of signal
//! sources and tracks a bankroll:
//! - Each source yields a signed score in [-1, 1] (positive favors home) or abstains
//! - Enabled scores are combined by weight; the sign picks the side
//! - Stakes are flat or fractional Kelly, priced at stored odds or -110
//! - Terminal metrics are computed once over the full series
//!
//! A run moves `Configured -> Running -> Complete | Failed` and only a
//! complete run is persisted.

mod metrics;
mod run;
mod service;
mod sources;

pub use metrics::Metrics;
pub use run::{BacktestRequest, BacktestRun};
pub use service::BacktestService;
pub use sources::SourceKind;

use crate::error::{Error, Result};
use crate::types::Side;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// One weighted signal source in a model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Staking {
    #[default]
    Flat,
    Kelly,
}

/// A user-defined backtest model: a named, weighted set of sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub sport: String,
    pub sources: Vec<SourceConfig>,
    /// Combined scores closer to zero than this produce no bet
    #[serde(default)]
    pub min_abs_score: f64,
    /// Overrides the configured staking mode
    #[serde(default)]
    pub staking: Option<Staking>,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidModelConfig(msg));

        if self.name.trim().is_empty() {
            return invalid("model name is empty".to_string());
        }
        if self.sport.trim().is_empty() {
            return invalid(format!("model '{}' has no sport", self.name));
        }
        if self.sources.is_empty() {
            return invalid(format!("model '{}' has no sources", self.name));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.kind) {
                return invalid(format!("source '{}' listed twice", source.kind));
            }
            if !source.weight.is_finite() || source.weight < 0.0 {
                return invalid(format!(
                    "source '{}' has invalid weight {}",
                    source.kind, source.weight
                ));
            }
        }

        let enabled_weight: f64 = self.enabled_sources().map(|s| s.weight).sum();
        if enabled_weight <= 0.0 {
            return invalid(format!("model '{}' has no enabled source with positive weight", self.name));
        }
        if !(0.0..1.0).contains(&self.min_abs_score) {
            return invalid(format!("min_abs_score {} outside [0, 1)", self.min_abs_score));
        }
        Ok(())
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled && s.weight > 0.0)
    }
}

/// Bankroll and pricing settings shared by every run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub starting_bankroll: Decimal,
    pub flat_stake: Decimal,
    /// Price used when a game has no stored odds for the picked side
    pub default_odds: i32,
    pub staking: Staking,
    pub kelly_fraction: Decimal,
    pub max_stake_pct: Decimal,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            starting_bankroll: dec!(10000),
            flat_stake: dec!(100),
            default_odds: crate::odds::STANDARD_ODDS,
            staking: Staking::Flat,
            kelly_fraction: dec!(0.25),
            max_stake_pct: dec!(0.05),
        }
    }
}

impl BacktestSettings {
    pub fn validate(&self) -> Result<()> {
        if self.starting_bankroll <= Decimal::ZERO {
            return Err(Error::InvalidModelConfig("starting bankroll must be positive".to_string()));
        }
        if self.flat_stake <= Decimal::ZERO {
            return Err(Error::InvalidModelConfig("flat stake must be positive".to_string()));
        }
        if self.default_odds.abs() < 100 {
            return Err(Error::InvalidModelConfig(format!(
                "default odds {} are not valid American odds",
                self.default_odds
            )));
        }
        if self.kelly_fraction <= Decimal::ZERO || self.max_stake_pct <= Decimal::ZERO {
            return Err(Error::InvalidModelConfig("Kelly sizing must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacktestStatus {
    Configured,
    Running,
    Complete,
    Failed,
}

impl fmt::Display for BacktestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BacktestStatus::Configured => "configured",
            BacktestStatus::Running => "running",
            BacktestStatus::Complete => "complete",
            BacktestStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Win,
    Loss,
    Push,
}

/// One replayed game where the model made a pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestPrediction {
    pub game_id: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub side: Side,
    pub team: String,
    /// Combined signed score, positive favors home
    pub score: f64,
    pub confidence: f64,
    pub odds: i32,
    pub stake: Decimal,
    pub profit: Decimal,
    pub outcome: BetOutcome,
    pub bankroll_after: Decimal,
}

/// Immutable summary of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub id: Uuid,
    pub user_id: String,
    pub model_id: String,
    pub model_name: String,
    pub sport: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Decided picks; pushes are excluded
    pub total_predictions: usize,
    pub correct_predictions: usize,
    pub pushes: usize,
    pub accuracy: f64,
    /// Net profit over amount wagered
    pub roi: f64,
    /// Net profit over starting bankroll
    pub bankroll_roi: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough bankroll decline, as a fraction of the peak
    pub max_drawdown: f64,
    pub starting_bankroll: Decimal,
    pub final_bankroll: Decimal,
    pub total_wagered: Decimal,
    pub net_profit: Decimal,
    pub predictions: Vec<BacktestPrediction>,
    pub created_at: DateTime<Utc>,
}
