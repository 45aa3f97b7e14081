//! Configuration loading utilities
//!
//! Provides helper functions for loading configuration from various sources
//! with proper error handling and validation.

use crate::{Result, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration loader with multiple source support
#[derive(Debug)]
pub struct ConfigLoader {
    /// Default settings
    defaults: Settings,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            defaults: Settings::default(),
        }
    }

    /// Load configuration with precedence order:
    /// 1. Environment variables (highest priority)
    /// 2. Configuration file (explicit path, else the per-user default)
    /// 3. Default values (lowest priority)
    ///
    /// Command line flags are applied by the caller on top of the result.
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let mut settings = self.defaults.clone();

        match config_file {
            Some(path) if path.exists() => {
                info!("Loading configuration from file: {:?}", path);
                settings = Settings::from_file(path)?;
            }
            Some(path) => {
                return Err(crate::Error::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    info!("Loading configuration from file: {:?}", path);
                    settings = Settings::from_file(&path)?;
                } else {
                    debug!("No configuration file found, using defaults");
                }
            }
        }

        // Override with environment variables
        debug!("Applying environment variable overrides");
        settings = settings.merge_with_env()?;

        // Validate final configuration
        settings.validate()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:?}", settings);

        Ok(settings)
    }

    /// Load configuration from environment only
    pub fn from_env_only(&self) -> Result<Settings> {
        let settings = Settings::from_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get default configuration
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir().map(|dir| dir.join("pharmascrape").join("config.toml"));
    if path.is_none() {
        warn!("Could not determine the user configuration directory");
    }
    path
}
