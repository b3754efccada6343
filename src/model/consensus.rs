//! Cross-bookmaker agreement model
//!
//! Follows the side the market agrees on. When both teams carry an Elo
//! rating the pick is boosted if Elo agrees with the line and dampened if
//! it disagrees.

use super::{game_pick, prop_pick, ModelSettings, PredictionModel};
use crate::elo;
use crate::odds;
use crate::types::{AnalysisResult, BetType, GameContext, OddsSnapshot, PropSnapshot, Side};

pub struct ConsensusModel {
    settings: ModelSettings,
    /// Bookmakers needed before agreement means anything
    pub min_bookmakers: usize,
    /// Share of bookmakers that must favor the same side
    pub min_agreement: f64,
    /// Confidence added or removed by the Elo cross-check
    pub elo_adjustment: f64,
}

impl ConsensusModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            min_bookmakers: 3,
            min_agreement: 0.75,
            elo_adjustment: 0.05,
        }
    }

    fn agreement(&self, sides: &[Side], first: Side) -> Option<(Side, f64)> {
        if sides.len() < self.min_bookmakers {
            return None;
        }
        let first_count = sides.iter().filter(|s| **s == first).count();
        let other_count = sides.len() - first_count;
        let (side, count) = if first_count >= other_count {
            (first, first_count)
        } else {
            (first.opposite(), other_count)
        };
        let agreement = count as f64 / sides.len() as f64;
        if agreement < self.min_agreement {
            return None;
        }
        Some((side, agreement))
    }

    fn base_confidence(&self, agreement: f64) -> f64 {
        // 75% agreement -> 0.55, unanimous -> 0.70
        let strength = (agreement - self.min_agreement) / (1.0 - self.min_agreement);
        0.55 + strength.clamp(0.0, 1.0) * 0.15
    }
}

impl Default for ConsensusModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

impl PredictionModel for ConsensusModel {
    fn name(&self) -> &str {
        "consensus"
    }

    fn evaluate_game(
        &self,
        game_id: &str,
        odds: &[OddsSnapshot],
        context: &GameContext,
    ) -> Option<AnalysisResult> {
        let snapshot = odds.first()?;

        let sides: Vec<Side> = snapshot
            .bookmakers
            .iter()
            .filter_map(|b| b.home_spread)
            .filter(|spread| *spread != 0.0)
            .map(|spread| if spread < 0.0 { Side::Home } else { Side::Away })
            .collect();

        let (side, agreement) = self.agreement(&sides, Side::Home)?;
        let mut confidence = self.base_confidence(agreement);
        let mut reasoning = format!(
            "{:.0}% of {} bookmakers favor {} on the spread",
            agreement * 100.0,
            sides.len(),
            snapshot.team(side).unwrap_or_default()
        );

        if let (Some(home), Some(away)) = (context.home_rating, context.away_rating) {
            let expected_home = elo::expected_score(home, away);
            let elo_side = if expected_home > 0.5 {
                Some(Side::Home)
            } else if expected_home < 0.5 {
                Some(Side::Away)
            } else {
                None
            };
            match elo_side {
                Some(s) if s == side => {
                    confidence += self.elo_adjustment;
                    reasoning.push_str(&format!("; Elo agrees ({:.0} vs {:.0})", home, away));
                }
                Some(_) => {
                    confidence -= self.elo_adjustment;
                    reasoning.push_str(&format!("; Elo disagrees ({:.0} vs {:.0})", home, away));
                }
                None => {}
            }
        }

        game_pick(
            self.name(),
            game_id,
            snapshot,
            BetType::Spread,
            side,
            self.settings.bound(confidence),
            reasoning,
        )
    }

    fn evaluate_prop(&self, prop: &PropSnapshot) -> Option<AnalysisResult> {
        // The side a book shades its juice toward is the side it expects
        let sides: Vec<Side> = prop
            .lines
            .iter()
            .filter_map(|l| {
                let over = odds::implied_probability(l.over_price);
                let under = odds::implied_probability(l.under_price);
                if over > under {
                    Some(Side::Over)
                } else if under > over {
                    Some(Side::Under)
                } else {
                    None
                }
            })
            .collect();

        let (side, agreement) = self.agreement(&sides, Side::Over)?;
        let confidence = self.settings.bound(self.base_confidence(agreement));
        let reasoning = format!(
            "{:.0}% of {} books shade {} {} toward the {}",
            agreement * 100.0,
            sides.len(),
            prop.player_name,
            prop.market_key,
            if side == Side::Over { "over" } else { "under" }
        );

        prop_pick(self.name(), prop, side, confidence, reasoning)
    }
}
