//! A single backtest run and its state machine

use super::{
    BacktestPrediction, BacktestResult, BacktestSettings, BacktestStatus, BetOutcome, Metrics,
    ModelConfig, Staking,
};
use crate::elo::EloUpdater;
use crate::error::{Error, Result};
use crate::odds;
use crate::types::{CompletedGame, GameResult, Side};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Who asked for the run and over which dates
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub user_id: String,
    pub model_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BacktestRequest {
    pub fn validate(&self) -> Result<()> {
        if self.end_date < self.start_date {
            return Err(Error::InvalidModelConfig(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

pub struct BacktestRun {
    id: Uuid,
    config: ModelConfig,
    settings: BacktestSettings,
    elo: EloUpdater,
    status: BacktestStatus,
    failure: Option<String>,
}

impl BacktestRun {
    /// Validate the configuration and create a run in `Configured`
    pub fn new(config: ModelConfig, settings: BacktestSettings, elo: EloUpdater) -> Result<Self> {
        config.validate()?;
        settings.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            settings,
            elo,
            status: BacktestStatus::Configured,
            failure: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> BacktestStatus {
        self.status
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn transition(&mut self, to: BacktestStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (BacktestStatus::Configured, BacktestStatus::Running)
                | (BacktestStatus::Running, BacktestStatus::Complete)
                | (BacktestStatus::Running, BacktestStatus::Failed)
        );
        if !allowed {
            return Err(Error::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(BacktestStatus::Running)?;
        tracing::info!("Backtest {} started for model '{}'", self.id, self.config.name);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(BacktestStatus::Complete)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(BacktestStatus::Failed)?;
        let reason = reason.into();
        tracing::error!("Backtest {} failed: {}", self.id, reason);
        self.failure = Some(reason);
        Ok(())
    }

    /// Start, replay and complete in one step
    pub fn execute(&mut self, request: &BacktestRequest, games: &[CompletedGame]) -> Result<BacktestResult> {
        self.start()?;
        let result = self.evaluate(request, games)?;
        self.complete()?;
        Ok(result)
    }

    /// Replay `games` in date order. Only valid while `Running`.
    pub fn evaluate(&self, request: &BacktestRequest, games: &[CompletedGame]) -> Result<BacktestResult> {
        if self.status != BacktestStatus::Running {
            return Err(Error::InvalidStateTransition {
                from: self.status.to_string(),
                to: BacktestStatus::Running.to_string(),
            });
        }
        request.validate()?;

        let mut ordered: Vec<&CompletedGame> = games
            .iter()
            .filter(|g| g.sport == self.config.sport)
            .filter(|g| {
                let day = g.commence_time.date_naive();
                day >= request.start_date && day <= request.end_date
            })
            .collect();
        ordered.sort_by_key(|g| g.commence_time);

        let staking = self.config.staking.unwrap_or(self.settings.staking);
        let mut ratings: HashMap<String, f64> = HashMap::new();
        let mut bankroll = self.settings.starting_bankroll;
        let mut predictions = Vec::new();

        for game in ordered {
            if let Some(score) = self.combined_score(game, &ratings) {
                if score != 0.0 && score.abs() >= self.config.min_abs_score {
                    let prediction = self.settle(game, score, staking, bankroll);
                    bankroll = prediction.bankroll_after;
                    predictions.push(prediction);
                }
            }
            // Ratings only ever reflect games before the next one
            self.elo.apply_to_table(&mut ratings, game);
        }

        let metrics = Metrics::compute(&predictions, self.settings.starting_bankroll);
        tracing::info!(
            "Backtest {} replayed {} picks: accuracy {:.1}%, ROI {:.2}%, bankroll {}",
            self.id,
            metrics.total_predictions,
            metrics.accuracy * 100.0,
            metrics.roi * 100.0,
            metrics.final_bankroll
        );

        Ok(BacktestResult {
            id: self.id,
            user_id: request.user_id.clone(),
            model_id: request.model_id.clone(),
            model_name: self.config.name.clone(),
            sport: self.config.sport.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            total_predictions: metrics.total_predictions,
            correct_predictions: metrics.correct_predictions,
            pushes: metrics.pushes,
            accuracy: metrics.accuracy,
            roi: metrics.roi,
            bankroll_roi: metrics.bankroll_roi,
            sharpe_ratio: metrics.sharpe_ratio,
            max_drawdown: metrics.max_drawdown,
            starting_bankroll: self.settings.starting_bankroll,
            final_bankroll: metrics.final_bankroll,
            total_wagered: metrics.total_wagered,
            net_profit: metrics.net_profit,
            predictions,
            created_at: Utc::now(),
        })
    }

    /// Weighted mean of the sources that produced a score
    pub fn combined_score(&self, game: &CompletedGame, ratings: &HashMap<String, f64>) -> Option<f64> {
        let (weighted, total_weight) = self
            .config
            .enabled_sources()
            .filter_map(|source| {
                source
                    .kind
                    .evaluate(game, ratings, &self.elo)
                    .map(|score| (score * source.weight, source.weight))
            })
            .fold((0.0, 0.0), |(s, w), (score, weight)| (s + score, w + weight));

        if total_weight > 0.0 {
            Some(weighted / total_weight)
        } else {
            None
        }
    }

    fn settle(&self, game: &CompletedGame, score: f64, staking: Staking, bankroll: Decimal) -> BacktestPrediction {
        let side = if score > 0.0 { Side::Home } else { Side::Away };
        let confidence = (0.5 + score.abs() / 2.0).min(0.99);
        let odds = self.price(game, side);

        let stake = match staking {
            Staking::Flat => self.settings.flat_stake.min(bankroll),
            Staking::Kelly => odds::kelly_stake(
                bankroll,
                confidence,
                odds,
                self.settings.kelly_fraction,
                self.settings.max_stake_pct,
            ),
        }
        .max(Decimal::ZERO);

        let outcome = match (game.result(), side) {
            (GameResult::Tie, _) => BetOutcome::Push,
            (GameResult::HomeWin, Side::Home) | (GameResult::AwayWin, Side::Away) => BetOutcome::Win,
            _ => BetOutcome::Loss,
        };
        let profit = match outcome {
            BetOutcome::Win => odds::win_profit(stake, odds),
            BetOutcome::Loss => -stake,
            BetOutcome::Push => Decimal::ZERO,
        };

        BacktestPrediction {
            game_id: game.game_id.clone(),
            commence_time: game.commence_time,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            side,
            team: game.team(side).to_string(),
            score,
            confidence,
            odds,
            stake,
            profit,
            outcome,
            bankroll_after: bankroll + profit,
        }
    }

    /// Stored closing price, then opening price, then the default
    fn price(&self, game: &CompletedGame, side: Side) -> i32 {
        [game.closing_line.as_ref(), game.opening_line.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|line| match side {
                Side::Home => line.home_price,
                _ => line.away_price,
            })
            .unwrap_or(self.settings.default_odds)
    }
}
