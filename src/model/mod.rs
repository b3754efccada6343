//! Prediction models
//!
//! Each model turns odds snapshots plus contextual data into an opinion on
//! one bettable outcome, or abstains. Abstention is `None`, never a
//! low-confidence result, so the ensemble can simply leave the model out.

mod consensus;
mod contrarian;
mod ensemble;
mod hot_cold;
mod injury;
mod matchup;
mod momentum;
mod registry;
mod rest_schedule;
mod value;
#[cfg(test)]
mod tests;

pub use consensus::ConsensusModel;
pub use contrarian::ContrarianModel;
pub use ensemble::{EnsembleModel, ENSEMBLE_NAME};
pub use hot_cold::HotColdModel;
pub use injury::InjuryAwareModel;
pub use matchup::MatchupModel;
pub use momentum::MomentumModel;
pub use registry::{ModelRegistry, ALL_MODELS, MODEL_NAMES};
pub use rest_schedule::RestScheduleModel;
pub use value::ValueModel;

use crate::error::{Error, Result};
use crate::odds::STANDARD_ODDS;
use crate::types::{
    AnalysisResult, AnalysisType, BetType, GameContext, OddsSnapshot, PropSnapshot, Side,
};
use serde::{Deserialize, Serialize};

/// Trait for heuristic prediction models
pub trait PredictionModel: Send + Sync {
    /// Model name, used as the weighting and registry key
    fn name(&self) -> &str;

    /// Evaluate a game market. `odds` is ordered most recent first.
    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        context: &GameContext,
    ) -> Option<AnalysisResult>;

    /// Evaluate a player prop
    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult>;
}

/// Thresholds shared by every model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Minimum historical data points before a model will speak
    pub min_samples: usize,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            min_samples: 5,
            min_confidence: 0.5,
            max_confidence: 0.85,
        }
    }
}

impl ModelSettings {
    /// Requires `0 < min_confidence <= max_confidence <= 1` and `min_samples > 0`
    pub fn validate(&self) -> Result<()> {
        let (min, max) = (self.min_confidence, self.max_confidence);
        if !(min > 0.0 && min <= max && max <= 1.0) {
            return Err(Error::InvalidModelConfig(format!(
                "confidence range [{}, {}] must satisfy 0 < min <= max <= 1",
                min, max
            )));
        }
        if self.min_samples == 0 {
            return Err(Error::InvalidModelConfig("min_samples must be positive".to_string()));
        }
        Ok(())
    }

    /// Clamp into the emitted confidence range
    pub fn bound(&self, confidence: f64) -> f64 {
        confidence.max(self.min_confidence).min(self.max_confidence)
    }

    /// Map a signal strength in [0, 1] linearly onto [floor, ceiling], then bound
    pub fn scale(&self, strength: f64, floor: f64, ceiling: f64) -> f64 {
        let strength = strength.clamp(0.0, 1.0);
        self.bound(floor + strength * (ceiling - floor))
    }
}

/// Build a game-market result for `side`, pricing it at the best available line
pub(crate) fn game_pick(
    model_name: &str,
    game_id: &str,
    snapshot: &OddsSnapshot,
    bet_type: BetType,
    side: Side,
    confidence: f64,
    reasoning: String,
) -> Option<AnalysisResult> {
    let prediction = snapshot.label(bet_type, side)?;
    let (odds, bookmaker) = match snapshot.best_price(bet_type, side) {
        Some((price, book)) => (price, Some(book.to_string())),
        None => (STANDARD_ODDS, None),
    };

    Some(AnalysisResult {
        game_id: game_id.to_string(),
        sport: snapshot.sport.clone(),
        model_name: model_name.to_string(),
        analysis_type: AnalysisType::Game,
        bet_type,
        prediction,
        confidence,
        reasoning,
        recommended_odds: odds,
        home_team: Some(snapshot.home_team.clone()),
        away_team: Some(snapshot.away_team.clone()),
        player_name: None,
        market_key: None,
        bookmaker,
    })
}

/// Build a prop result for `side` (Over/Under)
pub(crate) fn prop_pick(
    model_name: &str,
    prop: &PropSnapshot,
    side: Side,
    confidence: f64,
    reasoning: String,
) -> Option<AnalysisResult> {
    let prediction = prop.label(side)?;
    let (odds, bookmaker) = prop.best_price(side)?;

    Some(AnalysisResult {
        game_id: prop.game_id.clone(),
        sport: prop.sport.clone(),
        model_name: model_name.to_string(),
        analysis_type: AnalysisType::Prop,
        bet_type: BetType::Prop,
        prediction,
        confidence,
        reasoning,
        recommended_odds: odds,
        home_team: None,
        away_team: None,
        player_name: Some(prop.player_name.clone()),
        market_key: Some(prop.market_key.clone()),
        bookmaker: Some(bookmaker.to_string()),
    })
}

/// Fraction of games won, over at most `limit` most recent games
pub(crate) fn win_rate(games: &[crate::types::GameRecord], limit: usize) -> f64 {
    let recent = &games[..games.len().min(limit)];
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().filter(|g| g.won()).count() as f64 / recent.len() as f64
}

pub(crate) fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
