//! ELO rating model
//!
//! This module provides the pure rating update formula and the calculator that
//! applies per-game K-factors and policies on top of it.

pub mod calculator;
pub mod elo;

// Re-export commonly used types
pub use calculator::{compute_update, expected_score, RatingCalculator, RatingUpdate};
pub use elo::EloRatingCalculator;
