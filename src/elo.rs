//! Elo rating updater
//!
//! `expected(A, B) = 1 / (1 + 10^((B - A) / 400))`, and after a game
//! `new = old + K * (actual - expected)` with actual 1 / 0.5 / 0.
//! Both teams are updated from the same pre-game snapshot.

use crate::error::Result;
use crate::storage::Store;
use crate::types::{CompletedGame, GameResult, TeamRating};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_RATING: f64 = 1500.0;
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Expected score of a team rated `rating_a` against one rated `rating_b`
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / 400.0))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    pub k_factor: f64,
    pub initial_rating: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
            initial_rating: DEFAULT_RATING,
        }
    }
}

/// Pre- and post-game ratings for one update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloUpdate {
    pub home_before: f64,
    pub away_before: f64,
    pub home_after: f64,
    pub away_after: f64,
    pub home_expected: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EloUpdater {
    config: EloConfig,
}

impl EloUpdater {
    pub fn new(config: EloConfig) -> Self {
        Self { config }
    }

    pub fn initial_rating(&self) -> f64 {
        self.config.initial_rating
    }

    /// Compute both new ratings from one snapshot of the old ones
    pub fn update(&self, home: f64, away: f64, result: GameResult) -> EloUpdate {
        let home_expected = expected_score(home, away);
        let away_expected = 1.0 - home_expected;
        let (home_actual, away_actual) = match result {
            GameResult::HomeWin => (1.0, 0.0),
            GameResult::AwayWin => (0.0, 1.0),
            GameResult::Tie => (0.5, 0.5),
        };

        EloUpdate {
            home_before: home,
            away_before: away,
            home_after: home + self.config.k_factor * (home_actual - home_expected),
            away_after: away + self.config.k_factor * (away_actual - away_expected),
            home_expected,
        }
    }

    /// Fold chronologically ordered games into a rating table keyed by team
    pub fn replay<'a>(&self, games: impl IntoIterator<Item = &'a CompletedGame>) -> HashMap<String, f64> {
        let mut table = HashMap::new();
        for game in games {
            self.apply_to_table(&mut table, game);
        }
        table
    }

    /// Apply one result to an in-memory table, returning the update
    pub fn apply_to_table(&self, table: &mut HashMap<String, f64>, game: &CompletedGame) -> EloUpdate {
        let home = self.rating_in(table, &game.home_team);
        let away = self.rating_in(table, &game.away_team);
        let update = self.update(home, away, game.result());
        table.insert(game.home_team.clone(), update.home_after);
        table.insert(game.away_team.clone(), update.away_after);
        update
    }

    pub fn rating_in(&self, table: &HashMap<String, f64>, team: &str) -> f64 {
        table.get(team).copied().unwrap_or(self.config.initial_rating)
    }

    /// Current rating from the store, defaulting to the initial rating
    pub async fn current_rating(&self, store: &dyn Store, sport: &str, team: &str) -> Result<f64> {
        Ok(store
            .latest_rating(sport, team)
            .await?
            .map(|r| r.rating)
            .unwrap_or(self.config.initial_rating))
    }

    /// Read both ratings, update, and append a new rating row for each team
    pub async fn apply_result(
        &self,
        store: &dyn Store,
        sport: &str,
        home_team: &str,
        away_team: &str,
        result: GameResult,
        at: DateTime<Utc>,
    ) -> Result<EloUpdate> {
        let home = self.current_rating(store, sport, home_team).await?;
        let away = self.current_rating(store, sport, away_team).await?;
        let update = self.update(home, away, result);

        store
            .append_team_rating(&TeamRating {
                sport: sport.to_string(),
                team: home_team.to_string(),
                rating: update.home_after,
                updated_at: at,
            })
            .await?;
        store
            .append_team_rating(&TeamRating {
                sport: sport.to_string(),
                team: away_team.to_string(),
                rating: update.away_after,
                updated_at: at,
            })
            .await?;

        tracing::info!(
            "Elo {} {:.1} -> {:.1}, {} {:.1} -> {:.1}",
            home_team,
            update.home_before,
            update.home_after,
            away_team,
            update.away_before,
            update.away_after
        );

        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RecordStore;
    use chrono::TimeZone;

    fn game(home: &str, away: &str, home_score: u32, away_score: u32, day: u32) -> CompletedGame {
        CompletedGame {
            game_id: format!("{}-{}-{}", home, away, day),
            sport: "basketball_nba".to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            commence_time: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            home_score,
            away_score,
            opening_line: None,
            closing_line: None,
            context: Default::default(),
        }
    }

    #[test]
    fn test_equal_ratings_expect_half() {
        assert_eq!(expected_score(1500.0, 1500.0), 0.5);
    }

    #[test]
    fn test_stronger_team_expected_to_win() {
        let expected = expected_score(1600.0, 1400.0);
        assert!((expected - 0.7597).abs() < 1e-4);
        assert!((expected + expected_score(1400.0, 1600.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_home_win_is_zero_sum() {
        let updater = EloUpdater::default();
        let update = updater.update(1500.0, 1500.0, GameResult::HomeWin);
        assert_eq!(update.home_after, 1516.0);
        assert_eq!(update.away_after, 1484.0);
        assert_eq!(update.home_after - 1500.0, 1500.0 - update.away_after);
    }

    #[test]
    fn test_tie_moves_toward_underdog() {
        let updater = EloUpdater::default();
        let update = updater.update(1600.0, 1400.0, GameResult::Tie);
        assert!(update.home_after < 1600.0);
        assert!(update.away_after > 1400.0);
    }

    #[test]
    fn test_replay_accumulates() {
        let updater = EloUpdater::default();
        let games = vec![game("A", "B", 100, 90, 1), game("A", "C", 80, 95, 2)];
        let table = updater.replay(&games);
        assert_eq!(table.len(), 3);
        assert_eq!(updater.rating_in(&table, "B"), 1484.0);
        assert!(updater.rating_in(&table, "C") > 1500.0);
        assert_eq!(updater.rating_in(&table, "unknown"), DEFAULT_RATING);
    }

    #[test]
    fn test_unrated_team_starts_at_initial_rating() {
        let store = RecordStore::in_memory();
        let updater = EloUpdater::default();
        let rating = tokio_test::block_on(updater.current_rating(&store, "basketball_nba", "Pistons")).unwrap();
        assert_eq!(rating, updater.initial_rating());
    }

    #[tokio::test]
    async fn test_apply_result_appends_ratings() {
        let store = RecordStore::in_memory();
        let updater = EloUpdater::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();

        let first = updater
            .apply_result(&store, "basketball_nba", "Lakers", "Grizzlies", GameResult::HomeWin, at)
            .await
            .unwrap();
        assert_eq!(first.home_before, 1500.0);

        let later = at + chrono::Duration::days(1);
        let second = updater
            .apply_result(&store, "basketball_nba", "Lakers", "Grizzlies", GameResult::AwayWin, later)
            .await
            .unwrap();
        assert_eq!(second.home_before, 1516.0);
        assert_eq!(second.away_before, 1484.0);

        let history = store.rating_history("basketball_nba", "Lakers").await.unwrap();
        assert_eq!(history.len(), 2);
    }
}
