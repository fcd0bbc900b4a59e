use std::sync::Arc;
use std::time::{Duration, Instant};

use histcache_core::{
    stable_signature, CacheEvent, CacheKey, CachedSegment, DirectReason, HistoryError, Message,
    MessageStore, MetricsCollector,
};

use crate::config::HistoryCacheConfig;
use crate::metrics::NoopMetrics;
use crate::stable_cache::StableCache;

/// Remaining lifetime below which a cache hit is reported as expiring soon.
const EXPIRY_WARNING: Duration = Duration::from_secs(3600);

/// Where the stable/dynamic boundary falls for a session of `total` messages.
///
/// The window covers `[base, total)`: the stable segment is
/// `[base, base + stable)` and the dynamic segment is the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBounds {
    pub total: usize,
    pub base: usize,
    pub stable: usize,
}

impl SegmentBounds {
    /// `None` when the session has no more than `dynamic_count` messages.
    pub fn compute(total: usize, window: usize, dynamic_count: usize) -> Option<Self> {
        if total <= dynamic_count {
            return None;
        }
        let stable = window
            .saturating_sub(dynamic_count)
            .min(total - dynamic_count);
        if stable == 0 {
            return None;
        }
        Some(Self {
            total,
            base: total - stable - dynamic_count,
            stable,
        })
    }

    pub fn dynamic_offset(&self) -> usize {
        self.base + self.stable
    }

    pub fn dynamic_len(&self) -> usize {
        self.total - self.dynamic_offset()
    }

    /// Messages covered by the window.
    pub fn len(&self) -> usize {
        self.total - self.base
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Plan<'a> {
    Direct(DirectReason),
    Incremental(&'a StableCache),
}

/// Read path of the history cache.
///
/// A request for exactly `window` messages with a cache configured takes the
/// incremental path: the stable segment comes from the cache when its
/// signature matches, the dynamic tail is always read from the message
/// store. Every other request reads the message store directly.
#[derive(Clone)]
pub struct IncrementalHistoryFetcher {
    messages: Arc<dyn MessageStore>,
    cache: Option<StableCache>,
    config: HistoryCacheConfig,
    metrics: Arc<dyn MetricsCollector>,
}

impl IncrementalHistoryFetcher {
    /// Create a fetcher. Fails if `config` cannot form a stable segment.
    pub fn new(
        messages: Arc<dyn MessageStore>,
        cache: Option<StableCache>,
        config: HistoryCacheConfig,
    ) -> Result<Self, HistoryError> {
        config.validate()?;
        Ok(Self {
            messages,
            cache,
            config,
            metrics: Arc::new(NoopMetrics),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &HistoryCacheConfig {
        &self.config
    }

    /// Whether a request for `limit_count` messages would consult the cache.
    pub fn uses_cache(&self, limit_count: usize) -> bool {
        matches!(self.plan(limit_count), Plan::Incremental(_))
    }

    fn plan(&self, limit_count: usize) -> Plan<'_> {
        match &self.cache {
            None => Plan::Direct(DirectReason::CacheDisabled),
            Some(_) if !self.config.enabled => Plan::Direct(DirectReason::CacheDisabled),
            Some(_) if limit_count != self.config.window => {
                Plan::Direct(DirectReason::LimitMismatch)
            }
            Some(cache) => Plan::Incremental(cache),
        }
    }

    /// The most recent `limit_count` messages of a session, oldest first.
    ///
    /// Message store errors propagate; cache errors never do.
    pub async fn fetch_history(
        &self,
        session_id: &str,
        limit_count: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        match self.plan(limit_count) {
            Plan::Direct(reason) => {
                tracing::debug!(session_id, limit_count, reason = ?reason, "direct history fetch");
                let total = self.messages.count_messages(session_id).await?;
                self.read_tail(session_id, total, limit_count, reason).await
            }
            Plan::Incremental(cache) => {
                self.fetch_incremental(cache, session_id, limit_count).await
            }
        }
    }

    async fn read_tail(
        &self,
        session_id: &str,
        total: usize,
        limit_count: usize,
        reason: DirectReason,
    ) -> Result<Vec<Message>, HistoryError> {
        let offset = total.saturating_sub(limit_count);
        let messages = self
            .messages
            .read_messages(session_id, offset, limit_count)
            .await?;
        self.metrics
            .on_event(CacheEvent::DirectRead {
                session_id: session_id.to_string(),
                reason,
                returned: messages.len(),
            })
            .await;
        Ok(messages)
    }

    async fn fetch_incremental(
        &self,
        cache: &StableCache,
        session_id: &str,
        limit_count: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        let started = Instant::now();
        let total = self.messages.count_messages(session_id).await?;

        let Some(bounds) =
            SegmentBounds::compute(total, self.config.window, self.config.dynamic_count)
        else {
            tracing::debug!(
                session_id,
                total,
                dynamic_count = self.config.dynamic_count,
                "too few messages for a stable segment"
            );
            return self
                .read_tail(session_id, total, limit_count, DirectReason::TooFewMessages)
                .await;
        };

        let signature = stable_signature(session_id, bounds.stable, total);
        let key = CacheKey::new(self.config.tenant.as_str(), session_id, signature.as_str());
        tracing::debug!(
            session_id,
            total,
            base = bounds.base,
            stable = bounds.stable,
            dynamic = bounds.dynamic_len(),
            signature = %signature,
            "incremental history fetch"
        );

        let cached = match cache.get(&key).await {
            Some(segment) => self.accept_cached(segment, &bounds, session_id, &signature),
            None => None,
        };

        let hit = cached.is_some();
        let stable = match cached {
            Some(messages) => {
                self.metrics
                    .on_event(CacheEvent::StableHit {
                        session_id: session_id.to_string(),
                        signature: signature.clone(),
                        messages: messages.len(),
                    })
                    .await;
                messages
            }
            None => {
                self.metrics
                    .on_event(CacheEvent::StableMiss {
                        session_id: session_id.to_string(),
                        signature: signature.clone(),
                    })
                    .await;
                self.load_and_populate(cache, &key, &bounds).await?
            }
        };
        let from_cache = if hit { stable.len() } else { 0 };

        let dynamic = self
            .messages
            .read_messages(session_id, bounds.dynamic_offset(), bounds.dynamic_len())
            .await?;

        let mut result = stable;
        result.extend(dynamic);

        let expected = limit_count.min(total);
        if result.len() > limit_count {
            tracing::error!(
                session_id,
                returned = result.len(),
                limit_count,
                "history result exceeds requested limit"
            );
        } else if result.len() < expected {
            tracing::warn!(
                session_id,
                returned = result.len(),
                expected,
                "history result shorter than available messages"
            );
        }

        tracing::info!(
            session_id,
            returned = result.len(),
            from_cache,
            hit_ratio = from_cache as f64 / result.len().max(1) as f64,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "incremental history fetch complete"
        );
        Ok(result)
    }

    /// Return the cached messages if the segment matches the boundary it was
    /// looked up for, `None` (treated as a miss) otherwise.
    fn accept_cached(
        &self,
        segment: CachedSegment,
        bounds: &SegmentBounds,
        session_id: &str,
        signature: &str,
    ) -> Option<Vec<Message>> {
        if segment.session_id != session_id {
            tracing::warn!(
                session_id,
                cached_session = %segment.session_id,
                signature,
                "cached segment belongs to another session, ignoring"
            );
            return None;
        }
        if segment.messages.len() != bounds.stable
            || segment.stable_count != bounds.stable
            || segment.total_count != bounds.total
        {
            tracing::warn!(
                session_id,
                signature,
                expected = bounds.stable,
                cached = segment.messages.len(),
                "cached segment does not match boundary, ignoring"
            );
            return None;
        }

        let age = segment.age();
        let remaining = self.config.ttl().saturating_sub(age);
        if remaining < EXPIRY_WARNING {
            tracing::warn!(
                session_id,
                signature,
                remaining_secs = remaining.as_secs(),
                "stable segment expires soon"
            );
        } else {
            tracing::debug!(
                session_id,
                signature,
                age_secs = age.as_secs(),
                "stable segment fresh"
            );
        }
        Some(segment.messages)
    }

    async fn load_and_populate(
        &self,
        cache: &StableCache,
        key: &CacheKey,
        bounds: &SegmentBounds,
    ) -> Result<Vec<Message>, HistoryError> {
        let messages = self
            .messages
            .read_messages(&key.session_id, bounds.base, bounds.stable)
            .await?;

        if messages.len() != bounds.stable {
            tracing::warn!(
                session_id = %key.session_id,
                expected = bounds.stable,
                read = messages.len(),
                "stable read came back short, not caching"
            );
            return Ok(messages);
        }

        let segment = CachedSegment::new(
            key.session_id.as_str(),
            bounds.stable,
            bounds.total,
            messages,
        );
        let event = if cache.put(key, &segment, self.config.ttl()).await {
            CacheEvent::Populated {
                session_id: key.session_id.clone(),
                signature: key.signature.clone(),
                messages: segment.messages.len(),
            }
        } else {
            CacheEvent::PopulateFailed {
                session_id: key.session_id.clone(),
                signature: key.signature.clone(),
            }
        };
        self.metrics.on_event(event).await;
        Ok(segment.messages)
    }
}
