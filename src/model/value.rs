//! Bookmaker margin model
//!
//! A thin margin means the market is efficiently priced and the favorite's
//! fair probability can be trusted. A fat margin with a clear favorite is
//! treated as exploitable.

use super::{game_pick, prop_pick, ModelSettings, PredictionModel};
use crate::odds;
use crate::types::{AnalysisResult, BetType, GameContext, OddsSnapshot, PropSnapshot, Side};

pub struct ValueModel {
    settings: ModelSettings,
    pub low_margin: f64,
    pub high_margin: f64,
    /// Fair probability a favorite needs in a high-margin market
    pub clear_favorite: f64,
}

impl ValueModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            low_margin: 0.03,
            high_margin: 0.06,
            clear_favorite: 0.65,
        }
    }

    /// Decide on a two-way market given mean margin and mean fair probability of side A
    fn judge(&self, margin: f64, fair_a: f64, side_a: Side) -> Option<(Side, f64, &'static str)> {
        let (side, fair) = if fair_a >= 0.5 {
            (side_a, fair_a)
        } else {
            (side_a.opposite(), 1.0 - fair_a)
        };

        if margin < self.low_margin {
            if fair < 0.52 {
                return None;
            }
            return Some((side, self.settings.bound(fair), "efficiently priced"));
        }

        if margin > self.high_margin && fair >= self.clear_favorite {
            let confidence = self.settings.bound(fair - margin / 2.0);
            return Some((side, confidence, "exploitable"));
        }

        None
    }
}

impl Default for ValueModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for ValueModel {
    fn name(&self) -> &str {
        "value"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        _context: &GameContext,
    ) -> Option<AnalysisResult> {
        let snapshot = odds.first()?;
        let prices: Vec<(i32, i32)> = snapshot.bookmakers.iter().filter_map(|b| b.moneyline()).collect();
        if prices.is_empty() {
            return None;
        }

        let n = prices.len() as f64;
        let margin = prices.iter().map(|(h, a)| odds::bookmaker_margin(*h, *a)).sum::<f64>() / n;
        let fair_home = prices.iter().map(|(h, a)| odds::no_vig_probability(*h, *a)).sum::<f64>() / n;

        let (side, confidence, verdict) = self.judge(margin, fair_home, Side::Home)?;
        let fair = if side == Side::Home { fair_home } else { 1.0 - fair_home };
        let reasoning = format!(
            "Market {} at {:.1}% margin; fair probability {:.1}% for {}",
            verdict,
            margin * 100.0,
            fair * 100.0,
            snapshot.team(side).unwrap_or_default()
        );

        game_pick(self.name(), game_id, snapshot, BetType::Moneyline, side, confidence, reasoning)
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        if prop.lines.is_empty() {
            return None;
        }
        let n = prop.lines.len() as f64;
        let margin = prop
            .lines
            .iter()
            .map(|l| odds::bookmaker_margin(l.over_price, l.under_price))
            .sum::<f64>()
            / n;
        let fair_over = prop
            .lines
            .iter()
            .map(|l| odds::no_vig_probability(l.over_price, l.under_price))
            .sum::<f64>()
            / n;

        let (side, confidence, verdict) = self.judge(margin, fair_over, Side::Over)?;
        let reasoning = format!(
            "{} {} prop {} at {:.1}% margin",
            prop.player_name,
            prop.market_key,
            verdict,
            margin * 100.0
        );

        prop_pick(self.name(), prop, side, confidence, reasoning)
    }
}
