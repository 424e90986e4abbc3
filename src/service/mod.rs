//! Service layer for the rating ledger
//!
//! This module contains the facade an outer layer (the CLI here, an HTTP
//! server elsewhere) drives.

pub mod app;

pub use app::{LeaderboardEntry, PlayerSummary, ProbabilityMatrix, RatingService};
