//! Head-to-head and team style model

use super::{game_pick, prop_pick, ModelSettings, PredictionModel};
use crate::types::{AnalysisResult, BetType, GameContext, OddsSnapshot, PropSnapshot, Side, TeamStats};

pub struct MatchupModel {
    settings: ModelSettings,
    pub head_to_head_weight: f64,
    pub style_weight: f64,
    pub min_signal: f64,
    pub min_prop_gap: f64,
}

impl MatchupModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            head_to_head_weight: 0.6,
            style_weight: 0.4,
            min_signal: 0.15,
            min_prop_gap: 0.10,
        }
    }

    /// Offense-vs-defense edge squashed into (-1, 1)
    fn style_differential(home: &TeamStats, away: &TeamStats) -> f64 {
        let home_edge = home.points_for_avg - away.points_against_avg;
        let away_edge = away.points_for_avg - home.points_against_avg;
        ((home_edge - away_edge) / 10.0).tanh()
    }
}

impl Default for MatchupModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for MatchupModel {
    fn name(&self) -> &str {
        "matchup"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        context: &GameContext,
    ) -> Option<AnalysisResult> {
        let snapshot = odds.first()?;
        if context.head_to_head.len() < self.settings.min_samples {
            return None;
        }

        let meetings = context.head_to_head.len() as f64;
        let home_wins = context
            .head_to_head
            .iter()
            .filter(|m| m.winner() == Some(snapshot.home_team.as_str()))
            .count() as f64;
        let h2h_signal = (home_wins / meetings - 0.5) * 2.0;

        let (signal, style) = match (&context.home_stats, &context.away_stats) {
            (Some(home), Some(away)) => {
                let style = Self::style_differential(home, away);
                (self.head_to_head_weight * h2h_signal + self.style_weight * style, Some(style))
            }
            _ => (h2h_signal, None),
        };
        if signal.abs() < self.min_signal {
            return None;
        }

        let side = if signal > 0.0 { Side::Home } else { Side::Away };
        let confidence = self.settings.scale(signal.abs(), 0.52, 0.80);
        let mut reasoning = format!(
            "{} won {:.0} of {:.0} meetings",
            snapshot.home_team, home_wins, meetings
        );
        if let Some(style) = style {
            reasoning.push_str(&format!("; style differential {:+.2}", style));
        }

        game_pick(self.name(), game_id, snapshot, BetType::Moneyline, side, confidence, reasoning)
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        let allowed = prop.opponent_allowed_avg?;
        let line = prop.consensus_line()?;
        if line <= 0.0 {
            return None;
        }

        let gap = (allowed - line) / line;
        if gap.abs() < self.min_prop_gap {
            return None;
        }

        let side = if gap > 0.0 { Side::Over } else { Side::Under };
        let confidence = self.settings.scale(gap.abs() / 0.3, 0.53, 0.73);
        let reasoning = format!(
            "Opponent allows {:.1} {} vs line {:.1}",
            allowed, prop.market_key, line
        );

        prop_pick(self.name(), prop, side, confidence, reasoning)
    }
}
