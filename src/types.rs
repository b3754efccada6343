//! Core types shared by models, calibration, backtesting and storage

use crate::error::Error;
use crate::odds;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an analysis targets a game market or a player prop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Game,
    Prop,
}

/// Market a prediction is made on; part of the weighting key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Moneyline,
    Spread,
    Total,
    Prop,
}

impl BetType {
    pub const ALL: [BetType; 4] = [BetType::Moneyline, BetType::Spread, BetType::Total, BetType::Prop];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Moneyline => "moneyline",
            BetType::Spread => "spread",
            BetType::Total => "total",
            BetType::Prop => "prop",
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "moneyline" | "h2h" | "ml" => Ok(BetType::Moneyline),
            "spread" | "spreads" => Ok(BetType::Spread),
            "total" | "totals" => Ok(BetType::Total),
            "prop" | "props" | "player_props" => Ok(BetType::Prop),
            other => Err(Error::InvalidModelConfig(format!("unknown bet type '{}'", other))),
        }
    }
}

/// Side of a two-way market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
    Over,
    Under,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
            Side::Over => Side::Under,
            Side::Under => Side::Over,
        }
    }
}

/// Discrete risk tier derived from confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.65 {
            RiskLevel::Conservative
        } else if confidence >= 0.55 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Aggressive
        }
    }
}

/// Label prefix of a "do not bet this market" signal
pub const AVOID_PREFIX: &str = "Avoid ";

/// One model's opinion on one bettable outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub game_id: String,
    pub sport: String,
    pub model_name: String,
    pub analysis_type: AnalysisType,
    pub bet_type: BetType,
    /// Outcome label, e.g. a team name, "Lakers -3.5" or "Over 25.5"
    pub prediction: String,
    /// Confidence in the prediction (0-1]
    pub confidence: f64,
    pub reasoning: String,
    /// American odds for the predicted side
    pub recommended_odds: i32,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub market_key: Option<String>,
    #[serde(default)]
    pub bookmaker: Option<String>,
}

impl AnalysisResult {
    /// Expected return per unit staked, always derived from confidence and odds
    pub fn roi(&self) -> f64 {
        odds::expected_roi(self.confidence, self.recommended_odds)
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_confidence(self.confidence)
    }

    pub fn is_prop(&self) -> bool {
        self.analysis_type == AnalysisType::Prop
    }

    /// An "avoid" signal names a market to stay out of, not a side to back
    pub fn is_avoid(&self) -> bool {
        self.prediction
            .trim_start()
            .get(..AVOID_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(AVOID_PREFIX))
    }
}

/// An analysis plus ground truth once the event concluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedAnalysis {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    pub actual_outcome: String,
    pub analysis_correct: bool,
    pub outcome_verified_at: DateTime<Utc>,
}

impl VerifiedAnalysis {
    /// A push refunds both sides, so neither the pick nor its inverse was right
    pub fn is_push(&self) -> bool {
        self.actual_outcome.trim().eq_ignore_ascii_case("push")
    }
}

/// Calibration-derived weight for one (model, sport, bet_type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeight {
    pub model_name: String,
    pub sport: String,
    pub bet_type: BetType,
    pub weight: f64,
    /// Flip this model's prediction before the ensemble uses it
    pub inverted: bool,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub brier_score: Option<f64>,
    #[serde(default)]
    pub sample_size: usize,
    pub computed_at: DateTime<Utc>,
}

/// The weights in force for one scoring cycle, fetched fresh and passed down
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub sport: String,
    pub bet_type: BetType,
    pub weights: Vec<ModelWeight>,
    pub fetched_at: DateTime<Utc>,
}

impl WeightSnapshot {
    pub fn new(sport: &str, bet_type: BetType, weights: Vec<ModelWeight>) -> Self {
        Self {
            sport: sport.to_string(),
            bet_type,
            weights,
            fetched_at: Utc::now(),
        }
    }

    /// Snapshot with no recorded weights; every model gets the neutral share
    pub fn empty(sport: &str, bet_type: BetType) -> Self {
        Self::new(sport, bet_type, Vec::new())
    }

    pub fn get(&self, model_name: &str) -> Option<&ModelWeight> {
        self.weights.iter().find(|w| w.model_name == model_name)
    }

    pub fn is_inverted(&self, model_name: &str) -> bool {
        self.get(model_name).map(|w| w.inverted).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Elo strength rating for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub sport: String,
    pub team: String,
    pub rating: f64,
    pub updated_at: DateTime<Utc>,
}

// ==================== Odds ====================

/// One bookmaker's prices for a game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmakerLine {
    pub bookmaker: String,
    pub home_price: Option<i32>,
    pub away_price: Option<i32>,
    /// Home handicap, negative when home is favored
    pub home_spread: Option<f64>,
    pub home_spread_price: Option<i32>,
    pub away_spread_price: Option<i32>,
    pub total: Option<f64>,
    pub over_price: Option<i32>,
    pub under_price: Option<i32>,
}

impl BookmakerLine {
    pub fn price(&self, bet_type: BetType, side: Side) -> Option<i32> {
        match (bet_type, side) {
            (BetType::Moneyline, Side::Home) => self.home_price,
            (BetType::Moneyline, Side::Away) => self.away_price,
            (BetType::Spread, Side::Home) => self.home_spread_price,
            (BetType::Spread, Side::Away) => self.away_spread_price,
            (BetType::Total, Side::Over) => self.over_price,
            (BetType::Total, Side::Under) => self.under_price,
            _ => None,
        }
    }

    /// Both moneyline prices, when quoted
    pub fn moneyline(&self) -> Option<(i32, i32)> {
        Some((self.home_price?, self.away_price?))
    }
}

/// Odds for one game from every bookmaker at one capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub game_id: String,
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
    pub bookmakers: Vec<BookmakerLine>,
}

impl OddsSnapshot {
    /// Best (highest payout) price across bookmakers for a side
    pub fn best_price(&self, bet_type: BetType, side: Side) -> Option<(i32, &str)> {
        self.bookmakers
            .iter()
            .filter_map(|b| b.price(bet_type, side).map(|p| (p, b.bookmaker.as_str())))
            .max_by(|a, b| {
                odds::payout_multiplier(a.0)
                    .partial_cmp(&odds::payout_multiplier(b.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn average_home_spread(&self) -> Option<f64> {
        mean(self.bookmakers.iter().filter_map(|b| b.home_spread))
    }

    pub fn average_total(&self) -> Option<f64> {
        mean(self.bookmakers.iter().filter_map(|b| b.total))
    }

    /// Mean no-vig home win probability across bookmakers quoting a moneyline
    pub fn average_home_probability(&self) -> Option<f64> {
        mean(
            self.bookmakers
                .iter()
                .filter_map(|b| b.moneyline())
                .map(|(h, a)| odds::no_vig_probability(h, a)),
        )
    }

    pub fn team(&self, side: Side) -> Option<&str> {
        match side {
            Side::Home => Some(&self.home_team),
            Side::Away => Some(&self.away_team),
            _ => None,
        }
    }

    /// Human label for a side in a market, e.g. "Lakers -3.5" or "Over 221.5"
    pub fn label(&self, bet_type: BetType, side: Side) -> Option<String> {
        match (bet_type, side) {
            (BetType::Moneyline, Side::Home | Side::Away) => self.team(side).map(str::to_string),
            (BetType::Spread, Side::Home | Side::Away) => {
                let spread = self.average_home_spread()?;
                let spread = round_half(spread);
                let team_spread = if side == Side::Home { spread } else { -spread };
                Some(format!("{} {}", self.team(side)?, format_line(team_spread)))
            }
            (BetType::Total, Side::Over) => Some(format!("Over {}", round_half(self.average_total()?))),
            (BetType::Total, Side::Under) => Some(format!("Under {}", round_half(self.average_total()?))),
            _ => None,
        }
    }
}

/// One bookmaker's line on a player prop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropLine {
    pub bookmaker: String,
    pub line: f64,
    pub over_price: i32,
    pub under_price: i32,
}

/// A player prop market with the player history models need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSnapshot {
    pub game_id: String,
    pub sport: String,
    pub player_name: String,
    #[serde(default)]
    pub team: Option<String>,
    /// Market identifier, e.g. "player_points"
    pub market_key: String,
    pub lines: Vec<PropLine>,
    /// Consensus line at the previous capture
    #[serde(default)]
    pub previous_line: Option<f64>,
    /// Player's recent values for this stat, most recent first
    #[serde(default)]
    pub recent_values: Vec<f64>,
    /// Average the opponent allows for this stat
    #[serde(default)]
    pub opponent_allowed_avg: Option<f64>,
    #[serde(default)]
    pub rest_days: Option<u32>,
    #[serde(default)]
    pub injury_status: Option<InjuryStatus>,
    pub captured_at: DateTime<Utc>,
}

impl PropSnapshot {
    pub fn consensus_line(&self) -> Option<f64> {
        mean(self.lines.iter().map(|l| l.line))
    }

    pub fn best_price(&self, side: Side) -> Option<(i32, &str)> {
        self.lines
            .iter()
            .filter_map(|l| match side {
                Side::Over => Some((l.over_price, l.bookmaker.as_str())),
                Side::Under => Some((l.under_price, l.bookmaker.as_str())),
                _ => None,
            })
            .max_by(|a, b| {
                odds::payout_multiplier(a.0)
                    .partial_cmp(&odds::payout_multiplier(b.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn label(&self, side: Side) -> Option<String> {
        let line = round_half(self.consensus_line()?);
        match side {
            Side::Over => Some(format!("Over {}", line)),
            Side::Under => Some(format!("Under {}", line)),
            _ => None,
        }
    }
}

// ==================== Context ====================

/// A team's result in one past game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub team: String,
    pub opponent: String,
    pub date: NaiveDate,
    pub points_for: u32,
    pub points_against: u32,
    #[serde(default)]
    pub home: bool,
}

impl GameRecord {
    pub fn won(&self) -> bool {
        self.points_for > self.points_against
    }

    pub fn margin(&self) -> i64 {
        self.points_for as i64 - self.points_against as i64
    }
}

/// Season aggregates for a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team: String,
    pub games_played: u32,
    pub points_for_avg: f64,
    pub points_against_avg: f64,
    #[serde(default)]
    pub pace: Option<f64>,
}

impl TeamStats {
    pub fn net_rating(&self) -> f64 {
        self.points_for_avg - self.points_against_avg
    }
}

/// Rest and travel leading into a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    pub team: String,
    pub rest_days: u32,
    #[serde(default)]
    pub travel_miles: f64,
    #[serde(default)]
    pub games_last_7_days: u32,
}

impl ScheduleInfo {
    pub fn back_to_back(&self) -> bool {
        self.rest_days == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
    DayToDay,
    Probable,
}

impl InjuryStatus {
    /// Probability-like weight that the player misses the game
    pub fn severity(&self) -> f64 {
        match self {
            InjuryStatus::Out => 1.0,
            InjuryStatus::Doubtful => 0.75,
            InjuryStatus::Questionable => 0.5,
            InjuryStatus::DayToDay => 0.3,
            InjuryStatus::Probable => 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryReport {
    pub team: String,
    pub player: String,
    pub status: InjuryStatus,
    /// Player's share of team production (0-1)
    #[serde(default = "default_impact")]
    pub impact: f64,
}

fn default_impact() -> f64 {
    0.1
}

/// A past meeting between two teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHeadRecord {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
}

impl HeadToHeadRecord {
    pub fn winner(&self) -> Option<&str> {
        if self.home_score > self.away_score {
            Some(&self.home_team)
        } else if self.away_score > self.home_score {
            Some(&self.away_team)
        } else {
            None
        }
    }
}

/// Contextual data for one game; any part may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameContext {
    pub home_rating: Option<f64>,
    pub away_rating: Option<f64>,
    /// Most recent first
    pub home_recent: Vec<GameRecord>,
    pub away_recent: Vec<GameRecord>,
    pub home_stats: Option<TeamStats>,
    pub away_stats: Option<TeamStats>,
    pub home_schedule: Option<ScheduleInfo>,
    pub away_schedule: Option<ScheduleInfo>,
    /// `None` when no injury report could be read
    pub injuries: Option<Vec<InjuryReport>>,
    pub head_to_head: Vec<HeadToHeadRecord>,
}

// ==================== Completed games ====================

/// Moneyline and spread at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameLine {
    pub home_price: Option<i32>,
    pub away_price: Option<i32>,
    pub home_spread: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    HomeWin,
    AwayWin,
    Tie,
}

/// A finished game with its recorded outcome, used for replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGame {
    pub game_id: String,
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(default)]
    pub opening_line: Option<GameLine>,
    #[serde(default)]
    pub closing_line: Option<GameLine>,
    #[serde(default)]
    pub context: GameContext,
}

impl CompletedGame {
    pub fn result(&self) -> GameResult {
        if self.home_score > self.away_score {
            GameResult::HomeWin
        } else if self.away_score > self.home_score {
            GameResult::AwayWin
        } else {
            GameResult::Tie
        }
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Away => &self.away_team,
            _ => &self.home_team,
        }
    }
}

// ==================== Helpers ====================

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Round to the nearest half point, the granularity lines are quoted in
pub fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// Signed handicap, e.g. "-3.5", "+7", "PK"
pub fn format_line(value: f64) -> String {
    if value == 0.0 {
        "PK".to_string()
    } else if value > 0.0 {
        format!("+{}", value)
    } else {
        format!("{}", value)
    }
}
