use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use histcache_core::{
    CacheEvent, CacheKey, CacheOperation, CacheStore, CachedSegment, HistoryError,
    MetricsCollector,
};

use crate::metrics::NoopMetrics;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(150);

/// Fault-tolerant front for a [`CacheStore`].
///
/// Every operation is bounded by a timeout. Backend errors and timeouts are
/// logged, reported to the metrics collector and then replaced by the
/// neutral result: a miss for `get`, `false` for `put`, `0` for the bulk
/// operations. Nothing here ever returns an error to the caller.
#[derive(Clone)]
pub struct StableCache {
    store: Arc<dyn CacheStore>,
    metrics: Arc<dyn MetricsCollector>,
    op_timeout: Duration,
}

impl StableCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            metrics: Arc::new(NoopMetrics),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Look up a stable segment; `None` on miss or on any cache failure.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedSegment> {
        self.guarded(
            CacheOperation::Get,
            &key.tenant,
            Some(&key.session_id),
            Some(&key.signature),
            self.store.get(key),
        )
        .await
        .flatten()
    }

    /// Store a stable segment; `true` only when the backend confirmed the write.
    pub async fn put(&self, key: &CacheKey, segment: &CachedSegment, ttl: Duration) -> bool {
        self.guarded(
            CacheOperation::Put,
            &key.tenant,
            Some(&key.session_id),
            Some(&key.signature),
            self.store.put(key, segment, ttl),
        )
        .await
        .is_some()
    }

    /// Remove all entries of a session; `0` when none exist or on failure.
    pub async fn delete_by_session(&self, tenant: &str, session_id: &str) -> usize {
        self.guarded(
            CacheOperation::DeleteBySession,
            tenant,
            Some(session_id),
            None,
            self.store.delete_by_session(tenant, session_id),
        )
        .await
        .unwrap_or(0)
    }

    /// Remove all entries under a tenant; `0` on failure.
    pub async fn clear_tenant(&self, tenant: &str) -> usize {
        self.guarded(
            CacheOperation::ClearTenant,
            tenant,
            None,
            None,
            self.store.clear_tenant(tenant),
        )
        .await
        .unwrap_or(0)
    }

    /// Live entries under a tenant; `0` on failure.
    pub async fn count_entries(&self, tenant: &str) -> usize {
        self.guarded(
            CacheOperation::CountEntries,
            tenant,
            None,
            None,
            self.store.count_entries(tenant),
        )
        .await
        .unwrap_or(0)
    }

    /// Whether the backend answers a health check within the timeout.
    pub async fn is_available(&self) -> bool {
        self.guarded(CacheOperation::Ping, "-", None, None, self.store.ping())
            .await
            .is_some()
    }

    async fn guarded<T, F>(
        &self,
        operation: CacheOperation,
        tenant: &str,
        session_id: Option<&str>,
        signature: Option<&str>,
        fut: F,
    ) -> Option<T>
    where
        F: Future<Output = Result<T, HistoryError>>,
    {
        let outcome = match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(HistoryError::Timeout(format!(
                "cache {operation} exceeded {}ms",
                self.op_timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    operation = %operation,
                    tenant = %tenant,
                    session_id = session_id.unwrap_or("-"),
                    signature = signature.unwrap_or("-"),
                    error = %e,
                    "cache operation failed, continuing without cache"
                );
                self.metrics
                    .on_event(CacheEvent::CacheError {
                        operation,
                        tenant: tenant.to_string(),
                        session_id: session_id.map(str::to_string),
                        error: e.to_string(),
                    })
                    .await;
                None
            }
        }
    }
}
