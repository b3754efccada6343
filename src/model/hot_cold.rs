//! Recent form model
//!
//! Scores each team's recent run (win rate blended with average margin) and
//! backs the hotter team when the divergence is large enough.

use super::{average, game_pick, prop_pick, win_rate, ModelSettings, PredictionModel};
use crate::types::{AnalysisResult, BetType, GameContext, GameRecord, OddsSnapshot, PropSnapshot, Side};

pub struct HotColdModel {
    settings: ModelSettings,
    /// Games considered "recent"
    pub window: usize,
    pub min_divergence: f64,
    /// Relative gap between recent average and prop line
    pub min_prop_gap: f64,
}

impl HotColdModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            window: 10,
            min_divergence: 0.15,
            min_prop_gap: 0.08,
        }
    }

    /// Form in [0, 1]: 70% win rate, 30% margin mapped from [-10, +10] points
    fn form(&self, games: &[GameRecord]) -> f64 {
        let recent = &games[..games.len().min(self.window)];
        let margin = recent.iter().map(|g| g.margin() as f64).sum::<f64>() / recent.len().max(1) as f64;
        let margin_score = ((margin / 20.0).clamp(-0.5, 0.5)) + 0.5;
        0.7 * win_rate(recent, self.window) + 0.3 * margin_score
    }
}

impl Default for HotColdModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for HotColdModel {
    fn name(&self) -> &str {
        "hot_cold"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        context: &GameContext,
    ) -> Option<AnalysisResult> {
        let snapshot = odds.first()?;
        let min = self.settings.min_samples;
        if context.home_recent.len() < min || context.away_recent.len() < min {
            return None;
        }

        let home_form = self.form(&context.home_recent);
        let away_form = self.form(&context.away_recent);
        let divergence = home_form - away_form;
        if divergence.abs() < self.min_divergence {
            return None;
        }

        let side = if divergence > 0.0 { Side::Home } else { Side::Away };
        let confidence = self.settings.scale(divergence.abs() / 0.6, 0.52, 0.80);
        let reasoning = format!(
            "Form {:.2} vs {:.2}; {} is the hotter team",
            home_form,
            away_form,
            snapshot.team(side).unwrap_or_default()
        );

        game_pick(self.name(), game_id, snapshot, BetType::Moneyline, side, confidence, reasoning)
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        if prop.recent_values.len() < self.settings.min_samples {
            return None;
        }
        let line = prop.consensus_line()?;
        if line <= 0.0 {
            return None;
        }

        let window = prop.recent_values.len().min(self.window);
        let recent_avg = average(&prop.recent_values[..window])?;
        let gap = (recent_avg - line) / line;
        if gap.abs() < self.min_prop_gap {
            return None;
        }

        let side = if gap > 0.0 { Side::Over } else { Side::Under };
        let confidence = self.settings.scale(gap.abs() / 0.3, 0.53, 0.78);
        let reasoning = format!(
            "{} averaging {:.1} over last {} vs line {:.1}",
            prop.player_name, recent_avg, window, line
        );

        prop_pick(self.name(), prop, side, confidence, reasoning)
    }
}
