//! Fade-the-public model
//!
//! Large price disagreement between bookmakers is read as sharp action at
//! the outlier book and followed. Without that signal the model bets
//! against the listed favorite.

use super::{game_pick, prop_pick, ModelSettings, PredictionModel};
use crate::odds;
use crate::types::{AnalysisResult, BetType, GameContext, OddsSnapshot, PropSnapshot, Side};

pub struct ContrarianModel {
    settings: ModelSettings,
    pub min_bookmakers: usize,
    /// Fair-probability range across books treated as an imbalance
    pub min_imbalance: f64,
    /// Prop line range across books treated as an imbalance
    pub min_line_spread: f64,
    pub fade_confidence: f64,
}

impl ContrarianModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            min_bookmakers: 3,
            min_imbalance: 0.04,
            min_line_spread: 1.0,
            fade_confidence: 0.53,
        }
    }

    /// Which way the outlier sits relative to the pack: `true` when it is above the mean
    fn outlier_above(values: &[f64]) -> Option<(bool, f64)> {
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        if !max.is_finite() || !min.is_finite() {
            return None;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some((max - mean > mean - min, max - min))
    }
}

impl Default for ContrarianModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for ContrarianModel {
    fn name(&self) -> &str {
        "contrarian"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        _context: &GameContext,
    ) -> Option<AnalysisResult> {
        let snapshot = odds.first()?;
        let fair_home: Vec<f64> = snapshot
            .bookmakers
            .iter()
            .filter_map(|b| b.moneyline())
            .map(|(h, a)| odds::no_vig_probability(h, a))
            .collect();
        if fair_home.len() < self.min_bookmakers {
            return None;
        }

        let (above, range) = Self::outlier_above(&fair_home)?;
        if range >= self.min_imbalance {
            let side = if above { Side::Home } else { Side::Away };
            let confidence = self.settings.scale(range / 0.12, 0.55, 0.75);
            let reasoning = format!(
                "{:.1}% price imbalance across {} books; following sharp action on {}",
                range * 100.0,
                fair_home.len(),
                snapshot.team(side).unwrap_or_default()
            );
            return game_pick(self.name(), game_id, snapshot, BetType::Moneyline, side, confidence, reasoning);
        }

        let mean_home = fair_home.iter().sum::<f64>() / fair_home.len() as f64;
        let underdog = if mean_home > 0.5 {
            Side::Away
        } else if mean_home < 0.5 {
            Side::Home
        } else {
            return None;
        };
        let reasoning = format!(
            "No sharp signal; fading the public favorite {}",
            snapshot.team(underdog.opposite()).unwrap_or_default()
        );
        game_pick(
            self.name(),
            game_id,
            snapshot,
            BetType::Moneyline,
            underdog,
            self.settings.bound(self.fade_confidence),
            reasoning,
        )
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        if prop.lines.len() < self.min_bookmakers {
            return None;
        }
        let lines: Vec<f64> = prop.lines.iter().map(|l| l.line).collect();
        let (above, range) = Self::outlier_above(&lines)?;

        if range >= self.min_line_spread {
            // A book hanging a higher line has taken over money
            let side = if above { Side::Over } else { Side::Under };
            let confidence = self.settings.scale(range / 3.0, 0.55, 0.72);
            let reasoning = format!(
                "{:.1}-point line spread on {} {}; following the outlier book",
                range, prop.player_name, prop.market_key
            );
            return prop_pick(self.name(), prop, side, confidence, reasoning);
        }

        // The public leans over on player props
        let reasoning = format!("Fading public over action on {} {}", prop.player_name, prop.market_key);
        prop_pick(
            self.name(),
            prop,
            Side::Under,
            self.settings.bound(self.fade_confidence),
            reasoning,
        )
    }
}
