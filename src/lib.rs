//! Elo Ledger - rating ledger for casual two-player games
//!
//! This crate keeps per-game Elo ratings for players, queues submitted results
//! until an admin approves them, records approved results in an append-only
//! ledger and can reverse the most recent approval.

pub mod approval;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ErrorKind, RatingError, Result};
pub use types::*;

// Re-export key components
pub use approval::{ApprovalManager, ApprovalReport};
pub use rating::{EloRatingCalculator, RatingCalculator};
pub use service::RatingService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
