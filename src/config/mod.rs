//! Configuration management for the rating ledger
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and the per-game rating constants.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings, StorageSettings};
pub use rating::{GameConfig, GameSettings, KFactorDecay};
