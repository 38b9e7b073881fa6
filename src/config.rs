//! Configuration for pulse-monitor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Main configuration for a monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Analysis period in seconds
    pub analysis_interval_secs: u64,

    /// Which input modalities to monitor
    pub sources: SourceConfig,

    /// Directory holding the per-modality result files
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulse-monitor");

        Self {
            analysis_interval_secs: 120,
            sources: SourceConfig::default(),
            data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(e.to_string()))?;
            let config: Config =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&config_path, content).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulse-monitor")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Default sink path for the keyboard monitor.
    pub fn keyboard_output(&self) -> PathBuf {
        self.data_dir.join("keyboard_performance.csv")
    }

    /// Default sink path for the pointer monitor.
    pub fn pointer_output(&self) -> PathBuf {
        self.data_dir.join("pointer_performance.csv")
    }
}

/// Which input modalities to monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub pointer: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            pointer: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            keyboard: sources.iter().any(|s| s == "keyboard" || s == "all"),
            pointer: sources
                .iter()
                .any(|s| s == "pointer" || s == "mouse" || s == "all"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.pointer
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_parsing() {
        let config = SourceConfig::from_csv("keyboard,pointer");
        assert!(config.keyboard);
        assert!(config.pointer);

        let config = SourceConfig::from_csv("keyboard");
        assert!(config.keyboard);
        assert!(!config.pointer);

        let config = SourceConfig::from_csv("mouse");
        assert!(!config.keyboard);
        assert!(config.pointer);

        let config = SourceConfig::from_csv("all");
        assert!(config.keyboard);
        assert!(config.pointer);

        assert!(!SourceConfig::from_csv("none").any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis_interval_secs, 120);
        assert!(config.sources.keyboard);
        assert!(config.sources.pointer);
        assert!(config
            .keyboard_output()
            .ends_with("keyboard_performance.csv"));
    }
}
