//! Cache configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_STALENESS_HOURS: u64 = 24;

/// Cache configuration from `shopfront.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum collection age, in hours, before lookups refuse to serve it.
    pub staleness_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            staleness_hours: DEFAULT_STALENESS_HOURS,
        }
    }
}

impl CacheConfig {
    /// The staleness threshold as a duration.
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_hours * 3600)
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            staleness_hours: settings.staleness_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_24_hours() {
        let config = CacheConfig::default();
        assert_eq!(config.staleness_threshold(), Duration::from_secs(86_400));
    }

    #[test]
    fn threshold_follows_configured_hours() {
        let config = CacheConfig { staleness_hours: 1 };
        assert_eq!(config.staleness_threshold(), Duration::from_secs(3_600));
    }
}
