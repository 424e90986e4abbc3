//! ELO rating calculator driven by per-game configuration
//!
//! Picks each player's K-factor from their experience, runs the pure update
//! formula and then applies the game's optional minimum-change and rounding
//! policies.

use crate::config::rating::{GameConfig, GameSettings};
use crate::rating::calculator::{compute_update, RatingCalculator, RatingUpdate};
use crate::types::{GameResult, PlayerStanding};

/// ELO calculator for every configured game
#[derive(Debug, Clone, Default)]
pub struct EloRatingCalculator {
    settings: GameSettings,
}

impl EloRatingCalculator {
    pub fn new(settings: GameSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }
}

impl RatingCalculator for EloRatingCalculator {
    fn rate(
        &self,
        game: &str,
        player_a: PlayerStanding,
        player_b: PlayerStanding,
        result: GameResult,
    ) -> RatingUpdate {
        let config = self.settings.for_game(game);
        let update = compute_update(
            player_a.rating,
            player_b.rating,
            result,
            config.k_factor_for(player_a.games_played),
            config.k_factor_for(player_b.games_played),
        );

        apply_policies(config, player_a.rating, player_b.rating, update)
    }

    fn starting_rating(&self, game: &str) -> f64 {
        self.settings.for_game(game).starting_rating
    }
}

fn apply_policies(
    config: &GameConfig,
    rating_a: f64,
    rating_b: f64,
    mut update: RatingUpdate,
) -> RatingUpdate {
    if let Some(floor) = config.min_change {
        update.delta_a = enforce_min_change(update.delta_a, floor);
        update.delta_b = enforce_min_change(update.delta_b, floor);
    }

    if config.round_ratings {
        update.delta_a = (rating_a + update.delta_a).round() - rating_a;
        update.delta_b = (rating_b + update.delta_b).round() - rating_b;
    }

    update
}

fn enforce_min_change(delta: f64, floor: f64) -> f64 {
    if delta != 0.0 && delta.abs() < floor {
        floor.copysign(delta)
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rating::KFactorDecay;

    fn standing(rating: f64, games_played: u32) -> PlayerStanding {
        PlayerStanding {
            rating,
            games_played,
        }
    }

    #[test]
    fn test_dean_beats_eid() {
        let calculator = EloRatingCalculator::default();
        let update = calculator.rate(
            "chess",
            standing(1200.0, 0),
            standing(1200.0, 0),
            GameResult::Win,
        );

        assert_eq!(update.expected_a, 0.5);
        assert_eq!(1200.0 + update.delta_a, 1220.0);
        assert_eq!(1200.0 + update.delta_b, 1180.0);
    }

    #[test]
    fn test_k_factor_decays_at_threshold() {
        let calculator = EloRatingCalculator::default();

        let rookie = calculator.rate(
            "chess",
            standing(1200.0, 19),
            standing(1200.0, 19),
            GameResult::Win,
        );
        assert_eq!(rookie.k_factor_a, 40.0);
        assert_eq!(rookie.delta_a, 20.0);

        let veteran = calculator.rate(
            "chess",
            standing(1200.0, 20),
            standing(1200.0, 0),
            GameResult::Win,
        );
        assert_eq!(veteran.k_factor_a, 20.0);
        assert_eq!(veteran.k_factor_b, 40.0);
        assert_eq!(veteran.delta_a, 10.0);
        assert_eq!(veteran.delta_b, -20.0);
    }

    #[test]
    fn test_backgammon_uses_its_own_k_factor() {
        let calculator = EloRatingCalculator::default();
        let update = calculator.rate(
            "backgammon",
            standing(1200.0, 0),
            standing(1200.0, 0),
            GameResult::Loss,
        );
        assert_eq!(update.delta_a, -5.0);
        assert_eq!(update.delta_b, 5.0);
    }

    #[test]
    fn test_min_change_floor() {
        let mut settings = GameSettings::default();
        settings.games.insert(
            "chess".to_string(),
            GameConfig {
                min_change: Some(1.0),
                decay: None,
                ..GameConfig::default()
            },
        );
        let calculator = EloRatingCalculator::new(settings);

        // A heavy favourite winning would otherwise move less than a point
        let update = calculator.rate(
            "chess",
            standing(2400.0, 0),
            standing(1200.0, 0),
            GameResult::Win,
        );
        assert_eq!(update.delta_a, 1.0);
        assert_eq!(update.delta_b, -1.0);
    }

    #[test]
    fn test_round_ratings() {
        let mut settings = GameSettings::default();
        settings.games.insert(
            "pingpong".to_string(),
            GameConfig {
                round_ratings: true,
                decay: Some(KFactorDecay::default()),
                ..GameConfig::default()
            },
        );
        let calculator = EloRatingCalculator::new(settings);

        let update = calculator.rate(
            "pingpong",
            standing(1250.0, 0),
            standing(1200.0, 0),
            GameResult::Win,
        );
        let new_a = 1250.0 + update.delta_a;
        let new_b = 1200.0 + update.delta_b;
        assert_eq!(new_a, new_a.round());
        assert_eq!(new_b, new_b.round());
        assert_eq!(new_a, 1267.0);
        assert_eq!(new_b, 1183.0);
    }

    #[test]
    fn test_starting_rating() {
        let calculator = EloRatingCalculator::default();
        assert_eq!(calculator.starting_rating("chess"), 1200.0);
        assert_eq!(calculator.starting_rating("unknown"), 1200.0);
    }
}
