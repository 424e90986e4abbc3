//! Per-game rating configuration

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// K-factor reduction once a player has enough games behind them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KFactorDecay {
    /// Games played at which the reduced K-factor starts to apply
    pub threshold: u32,
    /// Reduced K-factor, never above the game's base K-factor
    pub reduced_k_factor: f64,
}

impl Default for KFactorDecay {
    fn default() -> Self {
        Self {
            threshold: 20,
            reduced_k_factor: 20.0,
        }
    }
}

/// Rating constants for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub k_factor: f64,
    pub starting_rating: f64,
    pub decay: Option<KFactorDecay>,
    /// Smallest rating change applied for a decided game
    pub min_change: Option<f64>,
    /// Round new ratings to whole points
    pub round_ratings: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            k_factor: 40.0,
            starting_rating: 1200.0,
            decay: Some(KFactorDecay::default()),
            min_change: None,
            round_ratings: false,
        }
    }
}

impl GameConfig {
    pub fn with_k_factor(k_factor: f64) -> Self {
        Self {
            k_factor,
            ..Self::default()
        }
    }

    /// K-factor for a player who has already played `games_played` games
    pub fn k_factor_for(&self, games_played: u32) -> f64 {
        match self.decay {
            Some(decay) if games_played >= decay.threshold => {
                decay.reduced_k_factor.min(self.k_factor)
            }
            _ => self.k_factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.k_factor > 0.0) {
            return Err(anyhow!("K-factor must be positive"));
        }
        if !self.starting_rating.is_finite() {
            return Err(anyhow!("Starting rating must be finite"));
        }
        if let Some(decay) = self.decay {
            if !(decay.reduced_k_factor > 0.0) {
                return Err(anyhow!("Reduced K-factor must be positive"));
            }
        }
        if let Some(min_change) = self.min_change {
            if !(min_change >= 0.0) {
                return Err(anyhow!("Minimum rating change cannot be negative"));
            }
        }
        Ok(())
    }
}

/// Lookup of game constants, with a fallback for games not listed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub default: GameConfig,
    /// Configured games are layered over the built-in ones
    #[serde(deserialize_with = "merge_with_builtin_games")]
    pub games: BTreeMap<String, GameConfig>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            default: GameConfig::default(),
            games: builtin_games(),
        }
    }
}

fn builtin_games() -> BTreeMap<String, GameConfig> {
    let mut games = BTreeMap::new();
    games.insert("chess".to_string(), GameConfig::with_k_factor(40.0));
    games.insert("pingpong".to_string(), GameConfig::with_k_factor(40.0));
    games.insert("backgammon".to_string(), GameConfig::with_k_factor(10.0));
    games
}

fn merge_with_builtin_games<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, GameConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let configured = BTreeMap::<String, GameConfig>::deserialize(deserializer)?;

    let mut games = builtin_games();
    games.extend(
        configured
            .into_iter()
            .map(|(game, config)| (game.to_lowercase(), config)),
    );
    Ok(games)
}

impl GameSettings {
    /// Configuration for `game`, case-insensitive, falling back to the default
    pub fn for_game(&self, game: &str) -> &GameConfig {
        self.games
            .get(&game.to_lowercase())
            .unwrap_or(&self.default)
    }

    pub fn validate(&self) -> Result<()> {
        self.default
            .validate()
            .map_err(|e| anyhow!("default game config: {}", e))?;
        for (game, config) in &self.games {
            config
                .validate()
                .map_err(|e| anyhow!("game '{}': {}", game, e))?;
        }
        Ok(())
    }
}
