//! [`Store`] implementation over a [`RecordTable`]

use super::{keys, MemoryTable, RecordTable, SortQuery, SqliteTable, Store};
use crate::backtest::BacktestResult;
use crate::error::{Error, Result};
use crate::types::{
    BetType, CompletedGame, GameRecord, HeadToHeadRecord, InjuryReport, ModelWeight, OddsSnapshot,
    PropSnapshot, ScheduleInfo, TeamRating, TeamStats, VerifiedAnalysis,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Typed store over a single keyed table
pub struct RecordStore<T: RecordTable> {
    table: T,
}

impl RecordStore<MemoryTable> {
    pub fn in_memory() -> Self {
        Self::new(MemoryTable::new())
    }
}

impl RecordStore<SqliteTable> {
    pub async fn sqlite(path: &str, max_connections: u32) -> Result<Self> {
        Ok(Self::new(SqliteTable::connect(path, max_connections).await?))
    }
}

impl<T: RecordTable> RecordStore<T> {
    pub fn new(table: T) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    async fn put_json<V: Serialize + Sync>(&self, pk: &str, sk: &str, value: &V) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.table.put(pk, sk, &payload).await
    }

    async fn get_json<V: DeserializeOwned>(&self, pk: &str, sk: &str) -> Result<Option<V>> {
        match self.table.get(pk, sk).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn query_json<V: DeserializeOwned>(&self, pk: &str, query: &SortQuery) -> Result<Vec<V>> {
        self.table
            .query(pk, query)
            .await?
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(Into::into))
            .collect()
    }

    // ==================== Ingestion writes ====================

    pub async fn put_odds_snapshot(&self, snapshot: &OddsSnapshot) -> Result<()> {
        self.put_json(&keys::odds(&snapshot.game_id), &keys::timestamp(&snapshot.captured_at), snapshot)
            .await
    }

    pub async fn put_prop_snapshot(&self, prop: &PropSnapshot) -> Result<()> {
        let sk = format!(
            "{}#{}#{}",
            prop.player_name,
            prop.market_key,
            keys::timestamp(&prop.captured_at)
        );
        self.put_json(&keys::props(&prop.game_id), &sk, prop).await
    }

    /// Rows are keyed by the pick itself, so a re-verification replaces the
    /// earlier outcome instead of adding a second row
    pub async fn put_verified_analysis(&self, verified: &VerifiedAnalysis) -> Result<()> {
        let analysis = &verified.analysis;
        let pk = keys::verified(&analysis.model_name, &analysis.sport, analysis.bet_type);
        let sk = keys::analysis_identity(
            &analysis.game_id,
            analysis.player_name.as_deref(),
            analysis.market_key.as_deref(),
        );
        self.put_json(&pk, &sk, verified).await
    }

    pub async fn put_game_record(&self, sport: &str, record: &GameRecord) -> Result<()> {
        let sk = format!("{}#{}", keys::date(&record.date), record.game_id);
        self.put_json(&keys::team_games(sport, &record.team), &sk, record).await
    }

    pub async fn put_team_stats(&self, sport: &str, stats: &TeamStats) -> Result<()> {
        self.put_json(&keys::stats(sport, &stats.team), keys::CURRENT, stats).await
    }

    pub async fn put_schedule(&self, sport: &str, schedule: &ScheduleInfo) -> Result<()> {
        self.put_json(&keys::schedule(sport, &schedule.team), keys::CURRENT, schedule).await
    }

    pub async fn put_injury(&self, sport: &str, report: &InjuryReport) -> Result<()> {
        self.put_json(&keys::injuries(sport, &report.team), &report.player, report).await
    }

    pub async fn put_head_to_head(&self, sport: &str, meeting: &HeadToHeadRecord) -> Result<()> {
        let pk = keys::head_to_head(sport, &meeting.home_team, &meeting.away_team);
        let sk = format!("{}#{}", keys::date(&meeting.date), meeting.home_team);
        self.put_json(&pk, &sk, meeting).await
    }

    pub async fn put_completed_game(&self, game: &CompletedGame) -> Result<()> {
        let sk = format!(
            "{}#{}",
            keys::date(&game.commence_time.date_naive()),
            game.game_id
        );
        self.put_json(&keys::games(&game.sport), &sk, game).await
    }

    /// Every rating row for a team, oldest first
    pub async fn rating_history(&self, sport: &str, team: &str) -> Result<Vec<TeamRating>> {
        self.query_json(&keys::rating(sport, team), &SortQuery::all()).await
    }

    /// Every stored backtest, oldest id first
    pub async fn backtest_results(&self) -> Result<Vec<BacktestResult>> {
        self.query_json(keys::BACKTESTS, &SortQuery::all()).await
    }

    /// Load a dataset produced by the ingestion side
    pub async fn import(&self, dataset: &Dataset) -> Result<ImportSummary> {
        for snapshot in &dataset.odds {
            self.put_odds_snapshot(snapshot).await?;
        }
        for prop in &dataset.props {
            self.put_prop_snapshot(prop).await?;
        }
        for verified in &dataset.verified_analyses {
            self.put_verified_analysis(verified).await?;
        }
        for record in &dataset.game_records {
            self.put_game_record(&dataset.sport, record).await?;
        }
        for stats in &dataset.team_stats {
            self.put_team_stats(&dataset.sport, stats).await?;
        }
        for schedule in &dataset.schedules {
            self.put_schedule(&dataset.sport, schedule).await?;
        }
        for report in &dataset.injuries {
            self.put_injury(&dataset.sport, report).await?;
        }
        for meeting in &dataset.head_to_head {
            self.put_head_to_head(&dataset.sport, meeting).await?;
        }
        for game in &dataset.completed_games {
            self.put_completed_game(game).await?;
        }
        for rating in &dataset.ratings {
            self.append_team_rating(rating).await?;
        }

        let summary = ImportSummary {
            odds: dataset.odds.len(),
            props: dataset.props.len(),
            verified_analyses: dataset.verified_analyses.len(),
            completed_games: dataset.completed_games.len(),
            other: dataset.game_records.len()
                + dataset.team_stats.len()
                + dataset.schedules.len()
                + dataset.injuries.len()
                + dataset.head_to_head.len()
                + dataset.ratings.len(),
        };
        tracing::info!("Imported dataset for {}: {:?}", dataset.sport, summary);
        Ok(summary)
    }
}

/// Bulk records for one sport, as written by the ingestion side
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub sport: String,
    pub odds: Vec<OddsSnapshot>,
    pub props: Vec<PropSnapshot>,
    pub verified_analyses: Vec<VerifiedAnalysis>,
    pub game_records: Vec<GameRecord>,
    pub team_stats: Vec<TeamStats>,
    pub schedules: Vec<ScheduleInfo>,
    pub injuries: Vec<InjuryReport>,
    pub head_to_head: Vec<HeadToHeadRecord>,
    pub completed_games: Vec<CompletedGame>,
    pub ratings: Vec<TeamRating>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub odds: usize,
    pub props: usize,
    pub verified_analyses: usize,
    pub completed_games: usize,
    pub other: usize,
}

#[async_trait]
impl<T: RecordTable> Store for RecordStore<T> {
    async fn odds_snapshots(&self, game_id: &str) -> Result<Vec<OddsSnapshot>> {
        self.query_json(&keys::odds(game_id), &SortQuery::newest_first()).await
    }

    async fn prop_snapshots(&self, game_id: &str) -> Result<Vec<PropSnapshot>> {
        let all: Vec<PropSnapshot> = self.query_json(&keys::props(game_id), &SortQuery::all()).await?;
        let mut latest: Vec<PropSnapshot> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        // Sort keys end in the capture time, so walk backwards to see the newest first
        for prop in all.into_iter().rev() {
            if seen.insert((prop.player_name.clone(), prop.market_key.clone())) {
                latest.push(prop);
            }
        }
        latest.reverse();
        Ok(latest)
    }

    async fn verified_analyses(
        &self,
        model_name: &str,
        sport: &str,
        bet_type: BetType,
        since: DateTime<Utc>,
    ) -> Result<Vec<VerifiedAnalysis>> {
        let all: Vec<VerifiedAnalysis> = self
            .query_json(&keys::verified(model_name, sport, bet_type), &SortQuery::all())
            .await?;
        let mut recent: Vec<VerifiedAnalysis> = all
            .into_iter()
            .filter(|v| v.outcome_verified_at >= since)
            .collect();
        recent.sort_by_key(|v| v.outcome_verified_at);
        Ok(recent)
    }

    async fn latest_rating(&self, sport: &str, team: &str) -> Result<Option<TeamRating>> {
        let mut rows: Vec<TeamRating> = self.query_json(&keys::rating(sport, team), &SortQuery::latest(1)).await?;
        Ok(rows.pop())
    }

    async fn recent_games(&self, sport: &str, team: &str, limit: usize) -> Result<Vec<GameRecord>> {
        self.query_json(&keys::team_games(sport, team), &SortQuery::latest(limit)).await
    }

    async fn team_stats(&self, sport: &str, team: &str) -> Result<Option<TeamStats>> {
        self.get_json(&keys::stats(sport, team), keys::CURRENT).await
    }

    async fn schedule(&self, sport: &str, team: &str) -> Result<Option<ScheduleInfo>> {
        self.get_json(&keys::schedule(sport, team), keys::CURRENT).await
    }

    async fn injuries(&self, sport: &str, team: &str) -> Result<Vec<InjuryReport>> {
        self.query_json(&keys::injuries(sport, team), &SortQuery::all()).await
    }

    async fn head_to_head(
        &self,
        sport: &str,
        team_a: &str,
        team_b: &str,
        limit: usize,
    ) -> Result<Vec<HeadToHeadRecord>> {
        self.query_json(&keys::head_to_head(sport, team_a, team_b), &SortQuery::latest(limit))
            .await
    }

    async fn completed_games(
        &self,
        sport: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CompletedGame>> {
        if end < start {
            return Ok(Vec::new());
        }
        self.query_json(
            &keys::games(sport),
            &SortQuery::between(keys::date(&start), keys::end_of(&end)),
        )
        .await
    }

    async fn model_weights(&self, sport: &str, bet_type: BetType) -> Result<Vec<ModelWeight>> {
        self.query_json(&keys::weights(sport, bet_type), &SortQuery::all()).await
    }

    async fn backtest_result(&self, id: Uuid) -> Result<Option<BacktestResult>> {
        self.get_json(keys::BACKTESTS, &id.to_string()).await
    }

    async fn replace_model_weights(
        &self,
        sport: &str,
        bet_type: BetType,
        weights: &[ModelWeight],
    ) -> Result<()> {
        if let Some(stray) = weights.iter().find(|w| w.sport != sport || w.bet_type != bet_type) {
            return Err(Error::Internal(format!(
                "weight for {} is keyed {} {}, not {} {}",
                stray.model_name, stray.sport, stray.bet_type, sport, bet_type
            )));
        }
        let rows = weights
            .iter()
            .map(|w| -> Result<(String, String)> { Ok((w.model_name.clone(), serde_json::to_string(w)?)) })
            .collect::<Result<Vec<_>>>()?;
        self.table.replace_partition(&keys::weights(sport, bet_type), &rows).await
    }

    async fn append_team_rating(&self, rating: &TeamRating) -> Result<()> {
        let sk = format!("{}#{}", keys::timestamp(&rating.updated_at), Uuid::new_v4());
        self.put_json(&keys::rating(&rating.sport, &rating.team), &sk, rating).await
    }

    async fn save_backtest_result(&self, result: &BacktestResult) -> Result<()> {
        self.put_json(keys::BACKTESTS, &result.id.to_string(), result).await
    }
}
