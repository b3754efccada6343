//! Scoring pipeline
//!
//! For each game:
//! - Read odds snapshots (no odds means nothing to score)
//! - Assemble the game context; every read stands alone and a failed read
//!   becomes absent data for that source only
//! - Run every model on the blocking pool, isolating panics per model
//! - Combine opinions per market with the current [`WeightSnapshot`];
//!   a market any model flags to avoid gets no recommendation
//! - Attach ROI, risk tier and a fractional Kelly stake to each ensemble pick


use crate::error::Result;
use crate::inverse::{self, Classification};
use crate::model::{EnsembleModel, PredictionModel};
use crate::odds;
use crate::storage::Store;
use crate::types::{
    AnalysisResult, BetType, GameContext, OddsSnapshot, PropSnapshot, WeightSnapshot,
};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bankroll suggested stakes are sized against
    pub bankroll: Decimal,
    pub kelly_fraction: Decimal,
    pub max_stake_pct: Decimal,
    /// Recent games loaded per team
    pub recent_games: usize,
    /// Past meetings loaded per matchup
    pub head_to_head_games: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bankroll: dec!(1000),
            kelly_fraction: dec!(0.25),
            max_stake_pct: dec!(0.05),
            recent_games: 10,
            head_to_head_games: 10,
        }
    }
}

/// An ensemble pick ready to surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub analysis: AnalysisResult,
    pub classification: Classification,
    pub suggested_stake: Decimal,
}

/// Everything produced for one game
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameAnalysis {
    pub game_id: String,
    /// Individual model opinions; abstentions are absent
    pub analyses: Vec<AnalysisResult>,
    pub recommendations: Vec<Recommendation>,
}

impl GameAnalysis {
    fn empty(game_id: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            ..Default::default()
        }
    }
}

/// Market an opinion belongs to; props are keyed per player and stat
type MarketKey = (BetType, Option<String>, Option<String>);

pub struct ScoringService {
    store: Arc<dyn Store>,
    models: Vec<Arc<dyn PredictionModel>>,
    config: ScoringConfig,
}

impl ScoringService {
    pub fn new(store: Arc<dyn Store>, models: Vec<Arc<dyn PredictionModel>>, config: ScoringConfig) -> Self {
        Self { store, models, config }
    }

    /// Score several games concurrently
    pub async fn analyze_games(&self, game_ids: &[String]) -> Vec<GameAnalysis> {
        join_all(game_ids.iter().map(|id| self.analyze_game(id))).await
    }

    pub async fn analyze_game(&self, game_id: &str) -> GameAnalysis {
        let odds = match self.store.odds_snapshots(game_id).await {
            Ok(odds) if !odds.is_empty() => odds,
            Ok(_) => {
                tracing::debug!("No odds for {}, nothing to score", game_id);
                return GameAnalysis::empty(game_id);
            }
            Err(e) => {
                tracing::warn!("Odds read failed for {}: {}", game_id, e);
                return GameAnalysis::empty(game_id);
            }
        };
        let latest = odds[0].clone();

        let (context, props) = tokio::join!(self.load_context(&latest), self.load_props(game_id));
        let analyses = self.run_models(game_id, Arc::new(odds), Arc::new(context), Arc::new(props.clone())).await;

        let mut snapshots: HashMap<BetType, WeightSnapshot> = HashMap::new();
        let mut recommendations = Vec::new();
        for ((bet_type, player, market), group) in group_by_market(&analyses) {
            if let Some(avoid) = group.iter().find(|a| a.is_avoid()) {
                tracing::info!(
                    "{} {}: {} flagged the market, no recommendation",
                    game_id,
                    avoid.prediction,
                    avoid.model_name
                );
                continue;
            }
            if !snapshots.contains_key(&bet_type) {
                let snapshot = self.weight_snapshot(&latest.sport, bet_type).await;
                snapshots.insert(bet_type, snapshot);
            }
            let Some(snapshot) = snapshots.get(&bet_type) else {
                continue;
            };

            let prop = props
                .iter()
                .find(|p| Some(&p.player_name) == player.as_ref() && Some(&p.market_key) == market.as_ref());
            let ensemble = EnsembleModel::new(snapshot.clone());
            if let Some(pick) = ensemble.combine(&group, Some(&latest), prop) {
                recommendations.push(self.recommend(pick));
            }
        }

        tracing::info!(
            "Scored {}: {} opinions, {} recommendations",
            game_id,
            analyses.len(),
            recommendations.len()
        );

        GameAnalysis {
            game_id: game_id.to_string(),
            analyses,
            recommendations,
        }
    }

    /// Current weights for a key, or an empty snapshot if they cannot be read
    pub async fn weight_snapshot(&self, sport: &str, bet_type: BetType) -> WeightSnapshot {
        match self.store.model_weights(sport, bet_type).await {
            Ok(weights) => WeightSnapshot::new(sport, bet_type, weights),
            Err(e) => {
                tracing::warn!("Weights read failed for {} {}, using neutral: {}", sport, bet_type, e);
                WeightSnapshot::empty(sport, bet_type)
            }
        }
    }

    /// Attach ROI, risk and a Kelly stake; an "avoid" signal is never staked
    pub fn recommend(&self, analysis: AnalysisResult) -> Recommendation {
        if analysis.is_avoid() {
            return Recommendation {
                classification: inverse::classify(&analysis),
                suggested_stake: Decimal::ZERO,
                analysis,
            };
        }
        let suggested_stake = odds::kelly_stake(
            self.config.bankroll,
            analysis.confidence,
            analysis.recommended_odds,
            self.config.kelly_fraction,
            self.config.max_stake_pct,
        );
        Recommendation {
            classification: inverse::classify(&analysis),
            suggested_stake,
            analysis,
        }
    }

    /// Read every context source independently
    pub async fn load_context(&self, odds: &OddsSnapshot) -> GameContext {
        let store = &self.store;
        let sport = odds.sport.as_str();
        let (home, away) = (odds.home_team.as_str(), odds.away_team.as_str());
        let recent = self.config.recent_games;

        let (
            home_rating,
            away_rating,
            home_recent,
            away_recent,
            home_stats,
            away_stats,
            home_schedule,
            away_schedule,
            home_injuries,
            away_injuries,
            head_to_head,
        ) = tokio::join!(
            store.latest_rating(sport, home),
            store.latest_rating(sport, away),
            store.recent_games(sport, home, recent),
            store.recent_games(sport, away, recent),
            store.team_stats(sport, home),
            store.team_stats(sport, away),
            store.schedule(sport, home),
            store.schedule(sport, away),
            store.injuries(sport, home),
            store.injuries(sport, away),
            store.head_to_head(sport, home, away, self.config.head_to_head_games),
        );

        let injuries = match (
            absent_on_error(home_injuries, "home injuries", home),
            absent_on_error(away_injuries, "away injuries", away),
        ) {
            (Some(mut home), Some(away)) => {
                home.extend(away);
                Some(home)
            }
            _ => None,
        };

        GameContext {
            home_rating: absent_on_error(home_rating, "rating", home).flatten().map(|r| r.rating),
            away_rating: absent_on_error(away_rating, "rating", away).flatten().map(|r| r.rating),
            home_recent: absent_on_error(home_recent, "recent games", home).unwrap_or_default(),
            away_recent: absent_on_error(away_recent, "recent games", away).unwrap_or_default(),
            home_stats: absent_on_error(home_stats, "team stats", home).flatten(),
            away_stats: absent_on_error(away_stats, "team stats", away).flatten(),
            home_schedule: absent_on_error(home_schedule, "schedule", home).flatten(),
            away_schedule: absent_on_error(away_schedule, "schedule", away).flatten(),
            injuries,
            head_to_head: absent_on_error(head_to_head, "head to head", home).unwrap_or_default(),
        }
    }

    async fn load_props(&self, game_id: &str) -> Vec<PropSnapshot> {
        absent_on_error(self.store.prop_snapshots(game_id).await, "props", game_id).unwrap_or_default()
    }

    /// Evaluate every model on the blocking pool. A model that panics is
    /// logged and left out; the others are unaffected.
    async fn run_models(
        &self,
        game_id: &str,
        odds: Arc<Vec<OddsSnapshot>>,
        context: Arc<GameContext>,
        props: Arc<Vec<PropSnapshot>>,
    ) -> Vec<AnalysisResult> {
        let tasks = self.models.iter().map(|model| {
            let model = Arc::clone(model);
            let odds = Arc::clone(&odds);
            let context = Arc::clone(&context);
            let props = Arc::clone(&props);
            let game_id = game_id.to_string();
            let name = model.name().to_string();
            let handle = tokio::task::spawn_blocking(move || {
                let mut results: Vec<AnalysisResult> = model
                    .evaluate_game(&game_id, &odds, &context)
                    .into_iter()
                    .collect();
                results.extend(props.iter().filter_map(|prop| model.evaluate_prop(prop)));
                results
            });
            async move { (name, handle.await) }
        });

        let mut analyses = Vec::new();
        for (name, outcome) in join_all(tasks).await {
            match outcome {
                Ok(results) => analyses.extend(results.into_iter().filter(valid_confidence)),
                Err(e) => tracing::warn!("Model {} failed on {}: {}", name, game_id, e),
            }
        }
        analyses
    }
}

fn valid_confidence(result: &AnalysisResult) -> bool {
    if result.confidence > 0.0 && result.confidence <= 1.0 {
        true
    } else {
        tracing::warn!(
            "Dropping {} pick with confidence {}",
            result.model_name,
            result.confidence
        );
        false
    }
}

/// Log a failed read and treat it as missing data
fn absent_on_error<T>(result: Result<T>, what: &str, subject: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to read {} for {}: {}", what, subject, e);
            None
        }
    }
}

fn group_by_market(analyses: &[AnalysisResult]) -> BTreeMap<MarketKey, Vec<AnalysisResult>> {
    let mut groups: BTreeMap<MarketKey, Vec<AnalysisResult>> = BTreeMap::new();
    for analysis in analyses {
        let key = (
            analysis.bet_type,
            analysis.player_name.clone(),
            analysis.market_key.clone(),
        );
        groups.entry(key).or_default().push(analysis.clone());
    }
    groups
}
