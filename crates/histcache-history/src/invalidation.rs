use std::sync::Arc;

use histcache_core::{CacheEvent, MetricsCollector};

use crate::metrics::NoopMetrics;
use crate::stable_cache::StableCache;

/// Write-path hook that drops a session's cached stable segments.
///
/// Invalidation is a full clear for the session. Signatures already embed the
/// message count, so a failed or skipped clear only delays reclaiming space
/// until the entries' TTL; it never causes stale reads.
#[derive(Clone)]
pub struct InvalidationHook {
    cache: Option<StableCache>,
    tenant: String,
    metrics: Arc<dyn MetricsCollector>,
}

impl InvalidationHook {
    pub fn new(cache: Option<StableCache>, tenant: impl Into<String>) -> Self {
        Self {
            cache,
            tenant: tenant.into(),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Call after a message for `session_id` has been durably written.
    ///
    /// Returns how many cache entries were cleared. Never fails: cache errors
    /// are logged by [`StableCache`] and reported here as zero.
    pub async fn on_message_appended(&self, session_id: &str) -> usize {
        let Some(cache) = &self.cache else {
            tracing::debug!(session_id, "no cache configured, skipping invalidation");
            return 0;
        };

        let cleared = cache.delete_by_session(&self.tenant, session_id).await;
        if cleared > 0 {
            tracing::info!(
                session_id,
                tenant = %self.tenant,
                cleared,
                "invalidated stable segments"
            );
        } else {
            tracing::debug!(session_id, tenant = %self.tenant, "no stable segments to invalidate");
        }

        self.metrics
            .on_event(CacheEvent::Invalidated {
                session_id: session_id.to_string(),
                entries: cleared,
            })
            .await;
        cleared
    }
}
