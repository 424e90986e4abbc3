//! Main application configuration
//!
//! This module defines the top-level configuration for the rating ledger,
//! including TOML and environment loading and validation.

use crate::config::rating::GameSettings;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub games: GameSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Where records are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Absolute base directory holding player records, the pending queue and
    /// the ledger. Empty until configured.
    pub data_dir: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "elo-ledger".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
        }
    }
}

impl StorageSettings {
    /// The configured data directory, or an error naming the ways to set it
    pub fn require_data_dir(&self) -> Result<&Path> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(anyhow!(
                "No data directory configured: set storage.data_dir, ELO_DATA_DIR or --data-dir"
            ));
        }
        Ok(&self.data_dir)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; missing sections take defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(data_dir) = env::var("ELO_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(k_factor) = env::var("DEFAULT_K_FACTOR") {
            config.games.default.k_factor = k_factor
                .parse()
                .map_err(|_| anyhow!("Invalid DEFAULT_K_FACTOR value: {}", k_factor))?;
        }
        if let Ok(rating) = env::var("DEFAULT_STARTING_RATING") {
            let rating: f64 = rating
                .parse()
                .map_err(|_| anyhow!("Invalid DEFAULT_STARTING_RATING value: {}", rating))?;
            config.games.default.starting_rating = rating;
            for game in config.games.games.values_mut() {
                game.starting_rating = rating;
            }
        }

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    let data_dir = &config.storage.data_dir;
    if !data_dir.as_os_str().is_empty() && !data_dir.is_absolute() {
        return Err(anyhow!(
            "Data directory must be an absolute path: {}",
            data_dir.display()
        ));
    }

    config.games.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert!(config.storage.require_data_dir().is_err());
    }

    #[test]
    fn test_relative_data_dir_is_rejected() {
        let mut config = AppConfig::default();
        config.storage.data_dir = PathBuf::from("database");
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("absolute"));

        config.storage.data_dir = std::env::temp_dir().join("elo");
        assert!(validate_config(&config).is_ok());
        assert_eq!(
            config.storage.require_data_dir().unwrap(),
            std::env::temp_dir().join("elo").as_path()
        );
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [service]
            log_level = "debug"

            [storage]
            data_dir = "/srv/elo"

            [games.games.darts]
            k_factor = 24.0
            "#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.service.name, "elo-ledger");
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/elo"));
        assert_eq!(config.games.for_game("darts").k_factor, 24.0);
        assert_eq!(config.games.for_game("backgammon").k_factor, 10.0);
        assert_eq!(config.games.for_game("chess").k_factor, 40.0);
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [games.default]
            k_factor = -5.0
            "#
        )
        .unwrap();

        assert!(AppConfig::from_file(file.path()).is_err());
    }
}
