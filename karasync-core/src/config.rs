use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Timing configuration for the sync loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Display loop tick interval
    #[serde(default = "default_display_tick")]
    pub display_tick_ms: u64,
    /// Host position-sync broadcast interval
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_ms: u64,
    /// Maximum anchor age before the virtual clock freezes
    #[serde(default = "default_freshness_threshold")]
    pub freshness_threshold_ms: u64,
}

const fn default_display_tick() -> u64 {
    50
}

const fn default_broadcast_interval() -> u64 {
    1000
}

const fn default_freshness_threshold() -> u64 {
    1000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            display_tick_ms: default_display_tick(),
            broadcast_interval_ms: default_broadcast_interval(),
            freshness_threshold_ms: default_freshness_threshold(),
        }
    }
}

impl SyncConfig {
    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load from the default config location, falling back to defaults when
    /// no config file exists.
    ///
    /// # Errors
    ///
    /// Returns an error only when a config file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Self> {
        let path = paths::config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    #[must_use]
    pub const fn display_tick(&self) -> Duration {
        Duration::from_millis(self.display_tick_ms)
    }

    #[must_use]
    pub const fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    #[must_use]
    pub const fn freshness_threshold(&self) -> Duration {
        Duration::from_millis(self.freshness_threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.display_tick_ms, 50);
        assert_eq!(config.broadcast_interval_ms, 1000);
        assert_eq!(config.freshness_threshold_ms, 1000);
    }

    #[test]
    fn test_parse_partial_toml_fills_defaults() {
        let config: SyncConfig = toml::from_str("broadcast_interval_ms = 500").unwrap();
        assert_eq!(config.broadcast_interval_ms, 500);
        assert_eq!(config.display_tick_ms, 50);
        assert_eq!(config.freshness_threshold_ms, 1000);
    }

    #[test]
    fn test_duration_accessors() {
        let config = SyncConfig::default();
        assert_eq!(config.display_tick(), Duration::from_millis(50));
        assert_eq!(config.broadcast_interval(), Duration::from_secs(1));
        assert_eq!(config.freshness_threshold(), Duration::from_secs(1));
    }
}
