//! Line movement model
//!
//! Compares the oldest and newest odds snapshots and follows the direction
//! the line moved, on the assumption that sharp money moved it.

use super::{game_pick, prop_pick, ModelSettings, PredictionModel};
use crate::types::{AnalysisResult, BetType, GameContext, OddsSnapshot, PropSnapshot, Side};

pub struct MomentumModel {
    settings: ModelSettings,
    /// Spread points of movement considered significant
    pub min_spread_move: f64,
    /// Fair-probability movement considered significant when no spread is quoted
    pub min_probability_move: f64,
    /// Relative prop line movement considered significant
    pub min_prop_move: f64,
}

impl MomentumModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            min_spread_move: 1.0,
            min_probability_move: 0.03,
            min_prop_move: 0.05,
        }
    }
}

impl Default for MomentumModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for MomentumModel {
    fn name(&self) -> &str {
        "momentum"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        _context: &GameContext,
    ) -> Option<AnalysisResult> {
        if odds.len() < 2 {
            return None;
        }
        let latest = odds.first()?;
        let earliest = odds.last()?;

        if let (Some(now), Some(then)) = (latest.average_home_spread(), earliest.average_home_spread()) {
            let movement = now - then;
            if movement.abs() >= self.min_spread_move {
                // Home spread getting more negative means money came in on home
                let side = if movement < 0.0 { Side::Home } else { Side::Away };
                let confidence = self.settings.scale(movement.abs() / 4.0, 0.55, 0.80);
                let reasoning = format!(
                    "Spread moved {:+.1} points ({:+.1} -> {:+.1}) toward {}",
                    movement,
                    then,
                    now,
                    latest.team(side).unwrap_or_default()
                );
                return game_pick(self.name(), game_id, latest, BetType::Spread, side, confidence, reasoning);
            }
        }

        let now = latest.average_home_probability()?;
        let then = earliest.average_home_probability()?;
        let movement = now - then;
        if movement.abs() < self.min_probability_move {
            return None;
        }

        let side = if movement > 0.0 { Side::Home } else { Side::Away };
        let confidence = self.settings.scale(movement.abs() / 0.12, 0.55, 0.80);
        let reasoning = format!(
            "Moneyline moved {:+.1}% in fair probability toward {}",
            movement * 100.0,
            latest.team(side).unwrap_or_default()
        );
        game_pick(self.name(), game_id, latest, BetType::Moneyline, side, confidence, reasoning)
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        let previous = prop.previous_line?;
        let current = prop.consensus_line()?;
        if previous <= 0.0 {
            return None;
        }

        let relative = (current - previous) / previous;
        if relative.abs() < self.min_prop_move {
            return None;
        }

        let side = if relative > 0.0 { Side::Over } else { Side::Under };
        let confidence = self.settings.scale(relative.abs() / 0.2, 0.55, 0.75);
        let reasoning = format!(
            "{} {} line moved {:.1} -> {:.1}",
            prop.player_name, prop.market_key, previous, current
        );

        prop_pick(self.name(), prop, side, confidence, reasoning)
    }
}
