//! Config loading, validation, and serialization.

use super::model::Config;
use crate::error::{InhibitError, Result};
use std::path::Path;

/// Upper bound for `poll_interval_ms`.
const MAX_POLL_INTERVAL_MS: u16 = 60_000;

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(InhibitError::Config)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            InhibitError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| InhibitError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| InhibitError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `run_dir` must be a non-empty absolute path
    /// - `poll_interval_ms` must be in `1..=60000`
    pub fn validate(&self) -> Result<()> {
        if self.run_dir.as_os_str().is_empty() {
            return Err(InhibitError::Config(
                "config validation failed: run_dir must not be empty".to_string(),
            ));
        }

        if !self.run_dir.is_absolute() {
            return Err(InhibitError::Config(format!(
                "config validation failed: run_dir must be an absolute path (found '{}')",
                self.run_dir.display()
            )));
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(InhibitError::Config(format!(
                "config validation failed: poll_interval_ms must be between 1 and {} (found {})",
                MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }

        Ok(())
    }
}
