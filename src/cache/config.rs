//! Query cache configuration.
//!
//! Controlled through the `[cache]` section of `recollect.toml`.

use std::time::Duration;

use serde::Deserialize;

/// Query cache configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age after which an entry counts as stale even without an explicit
    /// invalidation. `None` keeps entries fresh until invalidated.
    pub stale_after_ms: Option<u64>,
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            stale_after_ms: settings.stale_after.map(millis),
        }
    }
}

impl CacheConfig {
    pub fn with_stale_after(mut self, age: Duration) -> Self {
        self.stale_after_ms = Some(millis(age));
        self
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_ms.map(Duration::from_millis)
    }
}

/// Whole milliseconds of `age`, saturating at `u64::MAX`.
fn millis(age: Duration) -> u64 {
    u64::try_from(age.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_never_expires() {
        assert!(CacheConfig::default().stale_after().is_none());
    }

    #[test]
    fn stale_after_roundtrips_through_millis() {
        let config = CacheConfig::default().with_stale_after(Duration::from_secs(30));
        assert_eq!(config.stale_after_ms, Some(30_000));
        assert_eq!(config.stale_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn oversized_age_saturates() {
        let config = CacheConfig::default().with_stale_after(Duration::MAX);
        assert_eq!(config.stale_after_ms, Some(u64::MAX));

        let settings = crate::config::CacheSettings {
            stale_after: Some(Duration::MAX),
        };
        assert_eq!(CacheConfig::from(&settings).stale_after_ms, Some(u64::MAX));
    }
}
