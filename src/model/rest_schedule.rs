//! Rest and travel fatigue model

use super::{game_pick, prop_pick, ModelSettings, PredictionModel};
use crate::types::{AnalysisResult, BetType, GameContext, OddsSnapshot, PropSnapshot, ScheduleInfo, Side};

pub struct RestScheduleModel {
    settings: ModelSettings,
    pub min_fatigue_delta: f64,
    pub back_to_back_penalty: f64,
    /// Fatigue per game played in the last seven days
    pub density_penalty: f64,
    /// Fatigue per thousand miles travelled
    pub travel_penalty: f64,
    /// Recovery per rest day, up to three days
    pub rest_credit: f64,
}

impl RestScheduleModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            min_fatigue_delta: 0.75,
            back_to_back_penalty: 1.5,
            density_penalty: 0.25,
            travel_penalty: 0.5,
            rest_credit: 0.3,
        }
    }

    pub fn fatigue(&self, schedule: &ScheduleInfo) -> f64 {
        let mut fatigue = 0.0;
        if schedule.back_to_back() {
            fatigue += self.back_to_back_penalty;
        }
        fatigue += schedule.games_last_7_days as f64 * self.density_penalty;
        fatigue += schedule.travel_miles / 1000.0 * self.travel_penalty;
        fatigue -= schedule.rest_days.min(3) as f64 * self.rest_credit;
        fatigue
    }
}

impl Default for RestScheduleModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for RestScheduleModel {
    fn name(&self) -> &str {
        "rest_schedule"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        context: &GameContext,
    ) -> Option<AnalysisResult> {
        let snapshot = odds.first()?;
        let home = context.home_schedule.as_ref()?;
        let away = context.away_schedule.as_ref()?;

        let home_fatigue = self.fatigue(home);
        let away_fatigue = self.fatigue(away);
        let delta = away_fatigue - home_fatigue;
        if delta.abs() < self.min_fatigue_delta {
            return None;
        }

        let side = if delta > 0.0 { Side::Home } else { Side::Away };
        let confidence = self.settings.scale(delta.abs() / 3.0, 0.52, 0.75);
        let reasoning = format!(
            "Fatigue {:.2} (home, {} rest days) vs {:.2} (away, {} rest days); backing {}",
            home_fatigue,
            home.rest_days,
            away_fatigue,
            away.rest_days,
            snapshot.team(side).unwrap_or_default()
        );

        game_pick(self.name(), game_id, snapshot, BetType::Moneyline, side, confidence, reasoning)
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        // Only a back-to-back is a strong enough individual signal
        if prop.rest_days? != 0 {
            return None;
        }
        let reasoning = format!("{} on the second night of a back-to-back", prop.player_name);
        prop_pick(self.name(), prop, Side::Under, self.settings.bound(0.56), reasoning)
    }
}
