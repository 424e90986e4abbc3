//! Rating calculator trait and the ELO update formula
//!
//! `compute_update` is the pure rating model: two ratings, a result and a
//! K-factor per player in, two deltas out. Everything else (K-factor selection,
//! rounding policies) lives in the calculator implementations.

use crate::error::Result;
use crate::types::{GameResult, PlayerStanding};
use serde::{Deserialize, Serialize};
use skillratings::elo::EloRating;

/// Outcome of one rating calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    /// Expected score of player A before the game
    pub expected_a: f64,
    /// Expected score of player B before the game
    pub expected_b: f64,
    pub k_factor_a: f64,
    pub k_factor_b: f64,
    pub delta_a: f64,
    pub delta_b: f64,
}

/// Trait for calculating rating changes after a two-player game
pub trait RatingCalculator: Send + Sync {
    /// Calculate rating changes for both players of a game
    ///
    /// # Arguments
    /// * `game` - Game whose constants apply
    /// * `player_a` - Current standing of the first party
    /// * `player_b` - Current standing of the second party
    /// * `result` - Result from player A's perspective
    fn rate(
        &self,
        game: &str,
        player_a: PlayerStanding,
        player_b: PlayerStanding,
        result: GameResult,
    ) -> RatingUpdate;

    /// Rating a new player of `game` starts with
    fn starting_rating(&self, game: &str) -> f64;

    /// Probability-like expected score of A against B
    fn expected_score(&self, rating_a: f64, rating_b: f64) -> f64 {
        expected_score(rating_a, rating_b)
    }
}

/// Expected score of a player rated `rating_a` against one rated `rating_b`:
/// `1 / (1 + 10^((rating_b - rating_a) / 400))`
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    let (expected_a, _) = skillratings::elo::expected_score(
        &EloRating { rating: rating_a },
        &EloRating { rating: rating_b },
    );
    expected_a
}

/// Apply the ELO formula with a separate K-factor per player
pub fn compute_update(
    rating_a: f64,
    rating_b: f64,
    result: GameResult,
    k_factor_a: f64,
    k_factor_b: f64,
) -> RatingUpdate {
    let expected_a = expected_score(rating_a, rating_b);
    let expected_b = 1.0 - expected_a;
    let score_a = result.score();
    let score_b = 1.0 - score_a;

    RatingUpdate {
        expected_a,
        expected_b,
        k_factor_a,
        k_factor_b,
        delta_a: k_factor_a * (score_a - expected_a),
        delta_b: k_factor_b * (score_b - expected_b),
    }
}

/// Same as [`compute_update`] for a raw numeric score, which must be 0.0, 0.5 or 1.0
pub fn compute_update_from_score(
    rating_a: f64,
    rating_b: f64,
    score: f64,
    k_factor_a: f64,
    k_factor_b: f64,
) -> Result<RatingUpdate> {
    let result = GameResult::from_score(score)?;
    Ok(compute_update(
        rating_a, rating_b, result, k_factor_a, k_factor_b,
    ))
}
