//! Signal sources for backtest models
//!
//! Every source reads only what was known before tip-off and returns a
//! signed score in [-1, 1], positive favoring the home team, or `None`
//! when its inputs are missing.

use crate::elo::{expected_score, EloUpdater};
use crate::odds;
use crate::types::{CompletedGame, GameLine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const FORM_WINDOW: usize = 10;
const MIN_FORM_GAMES: usize = 3;
const MIN_MEETINGS: usize = 3;
/// Net rating gap (points) that maps to a score of ~0.76
const NET_RATING_SCALE: f64 = 10.0;
/// Spread move (points) that saturates the movement score
const SPREAD_MOVE_SCALE: f64 = 4.0;
/// Probability move that saturates the movement score
const PROBABILITY_MOVE_SCALE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    TeamStats,
    OddsMovement,
    RecentForm,
    HeadToHead,
    Elo,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::TeamStats => "team_stats",
            SourceKind::OddsMovement => "odds_movement",
            SourceKind::RecentForm => "recent_form",
            SourceKind::HeadToHead => "head_to_head",
            SourceKind::Elo => "elo",
        };
        f.write_str(s)
    }
}

impl SourceKind {
    /// Score `game` using only pre-game data. `ratings` holds Elo ratings
    /// replayed from earlier games in the same run.
    pub fn evaluate(
        &self,
        game: &CompletedGame,
        ratings: &HashMap<String, f64>,
        elo: &EloUpdater,
    ) -> Option<f64> {
        let score = match self {
            SourceKind::TeamStats => team_stats(game),
            SourceKind::OddsMovement => odds_movement(game),
            SourceKind::RecentForm => recent_form(game),
            SourceKind::HeadToHead => head_to_head(game),
            SourceKind::Elo => Some(elo_edge(game, ratings, elo)),
        }?;
        score.is_finite().then(|| score.clamp(-1.0, 1.0))
    }
}

fn team_stats(game: &CompletedGame) -> Option<f64> {
    let home = game.context.home_stats.as_ref()?;
    let away = game.context.away_stats.as_ref()?;
    Some(((home.net_rating() - away.net_rating()) / NET_RATING_SCALE).tanh())
}

/// Follow the line: a spread moving toward home (more negative) favors home
fn odds_movement(game: &CompletedGame) -> Option<f64> {
    let open = game.opening_line.as_ref()?;
    let close = game.closing_line.as_ref()?;

    if let (Some(open_spread), Some(close_spread)) = (open.home_spread, close.home_spread) {
        return Some((open_spread - close_spread) / SPREAD_MOVE_SCALE);
    }

    let open_prob = home_probability(open)?;
    let close_prob = home_probability(close)?;
    Some((close_prob - open_prob) / PROBABILITY_MOVE_SCALE)
}

fn home_probability(line: &GameLine) -> Option<f64> {
    Some(odds::no_vig_probability(line.home_price?, line.away_price?))
}

fn recent_form(game: &CompletedGame) -> Option<f64> {
    let home = &game.context.home_recent;
    let away = &game.context.away_recent;
    if home.len() < MIN_FORM_GAMES || away.len() < MIN_FORM_GAMES {
        return None;
    }
    let rate = |games: &[crate::types::GameRecord]| {
        let recent = &games[..games.len().min(FORM_WINDOW)];
        recent.iter().filter(|g| g.won()).count() as f64 / recent.len() as f64
    };
    Some(rate(home) - rate(away))
}

fn head_to_head(game: &CompletedGame) -> Option<f64> {
    let meetings = &game.context.head_to_head;
    if meetings.len() < MIN_MEETINGS {
        return None;
    }
    let net: i32 = meetings
        .iter()
        .map(|m| match m.winner() {
            Some(w) if w == game.home_team => 1,
            Some(w) if w == game.away_team => -1,
            _ => 0,
        })
        .sum();
    Some(net as f64 / meetings.len() as f64)
}

fn elo_edge(game: &CompletedGame, ratings: &HashMap<String, f64>, elo: &EloUpdater) -> f64 {
    let home = elo.rating_in(ratings, &game.home_team);
    let away = elo.rating_in(ratings, &game.away_team);
    2.0 * expected_score(home, away) - 1.0
}
