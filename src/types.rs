//! Common types used throughout the rating ledger

use crate::error::{RatingError, Result};
use crate::utils::normalize_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Player name, normalized to lower case `[a-z0-9_]`
pub type PlayerName = String;

/// Game name such as `chess` or `pingpong`
pub type GameName = String;

/// Isolation scope for players, pending results and the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Team(String),
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Global
    }
}

impl Scope {
    /// Team scope for a normalized team name
    pub fn team(name: &str) -> Result<Self> {
        Ok(Scope::Team(normalize_name("team", name)?))
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Team(team) => write!(f, "team:{}", team),
        }
    }
}

/// Identifies one player's record within a scope and game
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub scope: Scope,
    pub game: GameName,
    pub name: PlayerName,
}

impl PlayerKey {
    pub fn new(scope: &Scope, game: &str, name: &str) -> Self {
        Self {
            scope: scope.clone(),
            game: game.to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn not_found(&self) -> RatingError {
        RatingError::PlayerNotFound {
            game: self.game.clone(),
            name: self.name.clone(),
        }
    }
}

impl std::fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.game, self.name)
    }
}

/// Outcome of a game from one player's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum GameResult {
    Loss,
    Draw,
    Win,
}

impl GameResult {
    /// Parse a numeric score, rejecting anything other than 0.0, 0.5 or 1.0
    pub fn from_score(score: f64) -> Result<Self> {
        if score == 1.0 {
            Ok(GameResult::Win)
        } else if score == 0.5 {
            Ok(GameResult::Draw)
        } else if score == 0.0 {
            Ok(GameResult::Loss)
        } else {
            Err(RatingError::InvalidResult { value: score })
        }
    }

    pub fn score(self) -> f64 {
        match self {
            GameResult::Win => 1.0,
            GameResult::Draw => 0.5,
            GameResult::Loss => 0.0,
        }
    }

    /// The same game seen from the opponent's side
    pub fn reversed(self) -> Self {
        match self {
            GameResult::Win => GameResult::Loss,
            GameResult::Draw => GameResult::Draw,
            GameResult::Loss => GameResult::Win,
        }
    }
}

impl TryFrom<f64> for GameResult {
    type Error = RatingError;

    fn try_from(score: f64) -> Result<Self> {
        GameResult::from_score(score)
    }
}

impl From<GameResult> for f64 {
    fn from(result: GameResult) -> Self {
        result.score()
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameResult::Win => write!(f, "win"),
            GameResult::Draw => write!(f, "draw"),
            GameResult::Loss => write!(f, "loss"),
        }
    }
}

/// Which party of a recorded game a player was (white/black, server/receiver, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

/// One entry in a player's rating history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEvent {
    /// Rating after this event
    pub rating: f64,
    /// Opponent, `None` for the seed event
    pub opponent: Option<PlayerName>,
    /// Result from this player's perspective, `None` for the seed event
    pub result: Option<GameResult>,
    pub side: Option<Side>,
    pub timestamp: DateTime<Utc>,
    /// Games played including this one
    pub games_played: u32,
}

impl RatingEvent {
    /// The starting entry every player record begins with
    pub fn seed(starting_rating: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            rating: starting_rating,
            opponent: None,
            result: None,
            side: None,
            timestamp,
            games_played: 0,
        }
    }

    pub fn is_seed(&self) -> bool {
        self.opponent.is_none()
    }
}

/// Rating and experience of a player at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStanding {
    pub rating: f64,
    pub games_played: u32,
}

impl From<&RatingEvent> for PlayerStanding {
    fn from(event: &RatingEvent) -> Self {
        Self {
            rating: event.rating,
            games_played: event.games_played,
        }
    }
}

/// A submitted result waiting for admin approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingResult {
    pub game: GameName,
    pub player_a: PlayerName,
    pub player_b: PlayerName,
    /// Raw score from player A's perspective; validated again on approval
    pub result: f64,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A pending result together with its current queue position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPending {
    pub index: usize,
    #[serde(flatten)]
    pub pending: PendingResult,
}

/// An approved result as recorded in the results ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub game: GameName,
    pub player_a: PlayerName,
    pub player_b: PlayerName,
    /// Result from player A's perspective
    pub result: GameResult,
    pub rating_a: f64,
    pub rating_b: f64,
    pub delta_a: f64,
    pub delta_b: f64,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
}

impl LedgerEntry {
    pub fn new_rating_a(&self) -> f64 {
        self.rating_a + self.delta_a
    }

    pub fn new_rating_b(&self) -> f64 {
        self.rating_b + self.delta_b
    }
}
