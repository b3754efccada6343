//! Odds / outcome store
//!
//! The engine reads and writes through the [`Store`] trait. The provided
//! implementation, [`RecordStore`], lays every entity out in a single
//! partition-key + sort-key table ([`RecordTable`]) backed either by SQLite
//! or by memory.

mod memory;
mod record;
mod sqlite;

pub use memory::MemoryTable;
pub use record::{Dataset, RecordStore};
pub use sqlite::SqliteTable;

use crate::backtest::BacktestResult;
use crate::error::Result;
use crate::types::{
    BetType, CompletedGame, GameRecord, HeadToHeadRecord, InjuryReport, ModelWeight, OddsSnapshot,
    PropSnapshot, ScheduleInfo, TeamRating, TeamStats, VerifiedAnalysis,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

/// Read and write surface the engine consumes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // ----- reads -----

    /// Odds snapshots for a game, most recent first
    async fn odds_snapshots(&self, game_id: &str) -> Result<Vec<OddsSnapshot>>;

    /// Latest prop snapshot per (player, market) for a game
    async fn prop_snapshots(&self, game_id: &str) -> Result<Vec<PropSnapshot>>;

    /// Verified analyses for a model, oldest verification first, verified at
    /// or after `since`. A re-verified pick appears once, with its latest outcome.
    async fn verified_analyses(
        &self,
        model_name: &str,
        sport: &str,
        bet_type: BetType,
        since: DateTime<Utc>,
    ) -> Result<Vec<VerifiedAnalysis>>;

    async fn latest_rating(&self, sport: &str, team: &str) -> Result<Option<TeamRating>>;

    /// Most recent `limit` games for a team, most recent first
    async fn recent_games(&self, sport: &str, team: &str, limit: usize) -> Result<Vec<GameRecord>>;

    async fn team_stats(&self, sport: &str, team: &str) -> Result<Option<TeamStats>>;

    async fn schedule(&self, sport: &str, team: &str) -> Result<Option<ScheduleInfo>>;

    async fn injuries(&self, sport: &str, team: &str) -> Result<Vec<InjuryReport>>;

    /// Most recent `limit` meetings between two teams, most recent first
    async fn head_to_head(
        &self,
        sport: &str,
        team_a: &str,
        team_b: &str,
        limit: usize,
    ) -> Result<Vec<HeadToHeadRecord>>;

    /// Completed games with `start <= date <= end`, in chronological order
    async fn completed_games(
        &self,
        sport: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CompletedGame>>;

    async fn model_weights(&self, sport: &str, bet_type: BetType) -> Result<Vec<ModelWeight>>;

    async fn backtest_result(&self, id: Uuid) -> Result<Option<BacktestResult>>;

    // ----- writes -----

    /// Replace the whole weight set for (sport, bet_type) in one write.
    /// Models missing from `weights` lose their stored row.
    async fn replace_model_weights(
        &self,
        sport: &str,
        bet_type: BetType,
        weights: &[ModelWeight],
    ) -> Result<()>;

    /// Append a new rating row; earlier rows are kept
    async fn append_team_rating(&self, rating: &TeamRating) -> Result<()>;

    /// Persist a finished backtest; results are immutable once written
    async fn save_backtest_result(&self, result: &BacktestResult) -> Result<()>;
}

/// Range query against one partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortQuery {
    /// Inclusive lower bound on the sort key
    pub from: Option<String>,
    /// Inclusive upper bound on the sort key
    pub to: Option<String>,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl SortQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn latest(limit: usize) -> Self {
        Self {
            descending: true,
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn newest_first() -> Self {
        Self {
            descending: true,
            ..Self::default()
        }
    }

    pub fn since(from: String) -> Self {
        Self {
            from: Some(from),
            ..Self::default()
        }
    }

    pub fn between(from: String, to: String) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }
}

/// Partition-key + sort-key table holding JSON payloads
#[async_trait]
pub trait RecordTable: Send + Sync {
    /// Insert or fully replace the record at (pk, sk)
    async fn put(&self, pk: &str, sk: &str, payload: &str) -> Result<()>;

    async fn get(&self, pk: &str, sk: &str) -> Result<Option<String>>;

    async fn query(&self, pk: &str, query: &SortQuery) -> Result<Vec<String>>;

    /// Atomically swap the contents of partition `pk` for `rows` (sk, payload)
    async fn replace_partition(&self, pk: &str, rows: &[(String, String)]) -> Result<()>;
}

/// Key layout. Sort keys are fixed-width timestamps or ISO dates so that
/// lexicographic order is chronological order, except verified analyses,
/// which are keyed by pick and ordered by their payload's verification time.
pub(crate) mod keys {
    use super::*;

    pub const CURRENT: &str = "CURRENT";
    pub const BACKTESTS: &str = "BACKTEST";

    pub fn timestamp(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn date(day: &NaiveDate) -> String {
        day.format("%Y-%m-%d").to_string()
    }

    /// Upper bound covering every sort key that starts with `day`
    pub fn end_of(day: &NaiveDate) -> String {
        format!("{}~", date(day))
    }

    pub fn odds(game_id: &str) -> String {
        format!("ODDS#{}", game_id)
    }

    pub fn props(game_id: &str) -> String {
        format!("PROP#{}", game_id)
    }

    pub fn verified(model_name: &str, sport: &str, bet_type: BetType) -> String {
        format!("VERIFIED#{}#{}#{}", model_name, sport, bet_type)
    }

    /// One pick within a verified partition: the game plus, for props, player and market
    pub fn analysis_identity(game_id: &str, player: Option<&str>, market: Option<&str>) -> String {
        format!("{}#{}#{}", game_id, player.unwrap_or_default(), market.unwrap_or_default())
    }

    pub fn rating(sport: &str, team: &str) -> String {
        format!("RATING#{}#{}", sport, team)
    }

    pub fn team_games(sport: &str, team: &str) -> String {
        format!("TEAMGAMES#{}#{}", sport, team)
    }

    pub fn stats(sport: &str, team: &str) -> String {
        format!("STATS#{}#{}", sport, team)
    }

    pub fn schedule(sport: &str, team: &str) -> String {
        format!("SCHEDULE#{}#{}", sport, team)
    }

    pub fn injuries(sport: &str, team: &str) -> String {
        format!("INJURY#{}#{}", sport, team)
    }

    /// Order-independent key for a pair of teams
    pub fn head_to_head(sport: &str, team_a: &str, team_b: &str) -> String {
        let (first, second) = if team_a <= team_b { (team_a, team_b) } else { (team_b, team_a) };
        format!("H2H#{}#{}#{}", sport, first, second)
    }

    pub fn games(sport: &str) -> String {
        format!("GAME#{}", sport)
    }

    pub fn weights(sport: &str, bet_type: BetType) -> String {
        format!("WEIGHT#{}#{}", sport, bet_type)
    }
}
