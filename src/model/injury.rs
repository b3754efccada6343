//! Injury-aware model
//!
//! Aggregates injury severity per team and backs the healthier side. For
//! props, a player ruled out produces a definite "avoid" signal, the one
//! case allowed above the normal confidence ceiling.

use super::{game_pick, prop_pick, ModelSettings, PredictionModel};
use crate::types::{
    AnalysisResult, AnalysisType, BetType, GameContext, InjuryReport, InjuryStatus, OddsSnapshot,
    PropSnapshot, Side, AVOID_PREFIX,
};

/// Confidence attached to an "avoid" signal for a player ruled out
pub const AVOID_CONFIDENCE: f64 = 0.95;

pub struct InjuryAwareModel {
    settings: ModelSettings,
    /// Severity gap (impact-weighted points) needed to pick a side
    pub min_severity_delta: f64,
}

impl InjuryAwareModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            min_severity_delta: 1.0,
        }
    }

    /// Sum of status severity times production share, on a 0-10 scale per player
    pub fn team_severity(injuries: &[InjuryReport], team: &str) -> f64 {
        injuries
            .iter()
            .filter(|i| i.team == team)
            .map(|i| i.status.severity() * i.impact.clamp(0.0, 1.0) * 10.0)
            .sum()
    }

    fn avoid(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        let (odds, bookmaker) = prop.best_price(Side::Under)?;
        Some(AnalysisResult {
            game_id: prop.game_id.clone(),
            sport: prop.sport.clone(),
            model_name: self.name().to_string(),
            analysis_type: AnalysisType::Prop,
            bet_type: BetType::Prop,
            prediction: format!("{}{}", AVOID_PREFIX, prop.player_name),
            confidence: AVOID_CONFIDENCE,
            reasoning: format!("{} is ruled out", prop.player_name),
            recommended_odds: odds,
            home_team: None,
            away_team: None,
            player_name: Some(prop.player_name.clone()),
            market_key: Some(prop.market_key.clone()),
            bookmaker: Some(bookmaker.to_string()),
        })
    }
}

impl Default for InjuryAwareModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for InjuryAwareModel {
    fn name(&self) -> &str {
        "injury_aware"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        context: &GameContext,
    ) -> Option<AnalysisResult> {
        let snapshot = odds.first()?;
        let injuries = context.injuries.as_ref()?;

        let home = Self::team_severity(injuries, &snapshot.home_team);
        let away = Self::team_severity(injuries, &snapshot.away_team);
        let delta = away - home;
        if delta.abs() < self.min_severity_delta {
            return None;
        }

        let side = if delta > 0.0 { Side::Home } else { Side::Away };
        let confidence = self.settings.scale(delta.abs() / 4.0, 0.53, 0.80);
        let reasoning = format!(
            "Injury severity {:.1} (home) vs {:.1} (away); {} is healthier",
            home,
            away,
            snapshot.team(side).unwrap_or_default()
        );

        game_pick(self.name(), game_id, snapshot, BetType::Moneyline, side, confidence, reasoning)
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        let (confidence, label) = match prop.injury_status? {
            InjuryStatus::Out => return self.avoid(prop),
            InjuryStatus::Doubtful => (0.65, "doubtful"),
            InjuryStatus::Questionable => (0.58, "questionable"),
            _ => return None,
        };

        let reasoning = format!("{} listed {}; expecting limited minutes", prop.player_name, label);
        prop_pick(self.name(), prop, Side::Under, self.settings.bound(confidence), reasoning)
    }
}
