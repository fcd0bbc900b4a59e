use std::time::Duration;

use histcache_core::HistoryError;
use serde::{Deserialize, Serialize};

/// Tenant under which stable segments are cached.
pub const DEFAULT_TENANT: &str = "history_stable";

/// Configuration for the incremental history cache.
///
/// Every field has a default, so partial config files deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryCacheConfig {
    /// Master switch. When `false` every read takes the direct path.
    pub enabled: bool,
    /// Request size `N` that engages the cache. Other limits bypass it.
    pub window: usize,
    /// Newest messages always read fresh from the message store.
    pub dynamic_count: usize,
    /// Lifetime of a cached stable segment, in seconds.
    pub ttl_secs: u64,
    /// Cache namespace for stable segments.
    pub tenant: String,
    /// Upper bound for any single cache operation, in milliseconds.
    pub op_timeout_ms: u64,
}

impl Default for HistoryCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 40,
            dynamic_count: 2,
            ttl_secs: 86_400,
            tenant: DEFAULT_TENANT.to_string(),
            op_timeout_ms: 150,
        }
    }
}

impl HistoryCacheConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_dynamic_count(mut self, dynamic_count: usize) -> Self {
        self.dynamic_count = dynamic_count;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Size of the stable segment for a full window.
    pub fn stable_count(&self) -> usize {
        self.window.saturating_sub(self.dynamic_count)
    }

    /// Reject configurations that cannot form a stable segment.
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.dynamic_count == 0 {
            return Err(HistoryError::Config(
                "dynamic_count must be at least 1".to_string(),
            ));
        }
        if self.window <= self.dynamic_count {
            return Err(HistoryError::Config(format!(
                "window ({}) must exceed dynamic_count ({})",
                self.window, self.dynamic_count
            )));
        }
        if self.ttl_secs == 0 {
            return Err(HistoryError::Config("ttl_secs must be positive".to_string()));
        }
        if self.tenant.is_empty() {
            return Err(HistoryError::Config("tenant must not be empty".to_string()));
        }
        if self.op_timeout_ms == 0 {
            return Err(HistoryError::Config(
                "op_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HistoryCacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.window, 40);
        assert_eq!(config.dynamic_count, 2);
        assert_eq!(config.stable_count(), 38);
        assert_eq!(config.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.tenant, "history_stable");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_window_not_above_dynamic() {
        let config = HistoryCacheConfig::default()
            .with_window(2)
            .with_dynamic_count(2);
        assert!(matches!(config.validate(), Err(HistoryError::Config(_))));
    }

    #[test]
    fn rejects_zero_dynamic_count() {
        let config = HistoryCacheConfig::default().with_dynamic_count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_ttl_and_empty_tenant() {
        assert!(HistoryCacheConfig::default()
            .with_ttl(Duration::ZERO)
            .validate()
            .is_err());
        assert!(HistoryCacheConfig::default()
            .with_tenant("")
            .validate()
            .is_err());
    }

    #[test]
    fn op_timeout_saturates_instead_of_truncating() {
        let config = HistoryCacheConfig::default().with_op_timeout(Duration::MAX);
        assert_eq!(config.op_timeout_ms, u64::MAX);

        let config = HistoryCacheConfig::default().with_op_timeout(Duration::from_millis(75));
        assert_eq!(config.op_timeout(), Duration::from_millis(75));
    }
}
