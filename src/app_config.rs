//! Harness configuration.
//!
//! Settings may be given in a TOML file passed with `--config`; command-line flags override it.

use std::path::Path;

use dircache::DirCacheConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

fn default_iterations() -> u32 {
    10
}

/// Application configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Settings handed to the cache itself.
    #[serde(default)]
    pub cache: DirCacheConfig,

    /// How many warm passes to time after the cold one.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: DirCacheConfig::default(),
            iterations: default_iterations(),
        }
    }
}

/// Command-line settings that take precedence over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub iterations: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation errors: {0:?}")]
    ValidationErrors(Vec<String>),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = self.cache.validate().err().unwrap_or_default();

        if self.iterations == 0 {
            errors.push("iterations must be at least 1.".to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Loads config from a single TOML file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply(&mut self, overrides: Overrides) {
        if let Some(iterations) = overrides.iterations {
            self.iterations = iterations;
        }
    }

    /// Loads the configuration from `path` if given, or the defaults otherwise, applies
    /// `overrides`, and validates the result.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate().map_err(ConfigError::ValidationErrors)?;
        debug!("Loaded configuration successfully.");
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::load(None, Overrides::default()).is_ok());
    }

    #[test]
    fn loads_nested_cache_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "iterations = 3\n\n[cache]\nmax-age = \"5s\"\neviction = \"on-open\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), Overrides::default()).unwrap();
        assert_eq!(config.iterations, 3);
        assert_eq!(
            config.cache.max_age,
            Some(std::time::Duration::from_secs(5))
        );
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let config = Config {
            iterations: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn command_line_iterations_rescue_a_zero_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "iterations = 0\n").unwrap();

        assert!(matches!(
            Config::load(Some(&path), Overrides::default()),
            Err(ConfigError::ValidationErrors(_))
        ));
        let config = Config::load(
            Some(&path),
            Overrides {
                iterations: Some(5),
            },
        )
        .unwrap();
        assert_eq!(config.iterations, 5);
    }
}
