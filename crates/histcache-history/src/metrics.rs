use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use histcache_core::{CacheEvent, MetricsCollector};

/// Collector that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

#[async_trait]
impl MetricsCollector for NoopMetrics {
    async fn on_event(&self, _event: CacheEvent) {}
}

/// Point-in-time copy of [`CountingMetrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub direct_reads: u64,
    pub cache_errors: u64,
    pub populated: u64,
    pub populate_failures: u64,
    pub invalidations: u64,
    pub entries_invalidated: u64,
}

impl MetricsSnapshot {
    /// Share of stable lookups served from cache, or `None` before the first lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            None
        } else {
            Some(self.hits as f64 / lookups as f64)
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    direct_reads: AtomicU64,
    cache_errors: AtomicU64,
    populated: AtomicU64,
    populate_failures: AtomicU64,
    invalidations: AtomicU64,
    entries_invalidated: AtomicU64,
}

/// Collector that counts events. Clones share the same counters, so a test
/// can keep one handle and give another to the fetcher.
#[derive(Debug, Default, Clone)]
pub struct CountingMetrics {
    counters: Arc<Counters>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            direct_reads: c.direct_reads.load(Ordering::Relaxed),
            cache_errors: c.cache_errors.load(Ordering::Relaxed),
            populated: c.populated.load(Ordering::Relaxed),
            populate_failures: c.populate_failures.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
            entries_invalidated: c.entries_invalidated.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl MetricsCollector for CountingMetrics {
    async fn on_event(&self, event: CacheEvent) {
        let c = &self.counters;
        match event {
            CacheEvent::DirectRead { .. } => {
                c.direct_reads.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::StableHit { .. } => {
                c.hits.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::StableMiss { .. } => {
                c.misses.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::Populated { .. } => {
                c.populated.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::PopulateFailed { .. } => {
                c.populate_failures.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::CacheError { .. } => {
                c.cache_errors.fetch_add(1, Ordering::Relaxed);
            }
            CacheEvent::Invalidated { entries, .. } => {
                c.invalidations.fetch_add(1, Ordering::Relaxed);
                c.entries_invalidated
                    .fetch_add(entries as u64, Ordering::Relaxed);
            }
        }
    }
}

/// Collector that emits every event as a `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl TracingMetrics {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsCollector for TracingMetrics {
    async fn on_event(&self, event: CacheEvent) {
        match event {
            CacheEvent::DirectRead {
                session_id,
                reason,
                returned,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    reason = ?reason,
                    returned,
                    "history direct read"
                );
            }
            CacheEvent::StableHit {
                session_id,
                signature,
                messages,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    signature = %signature,
                    messages,
                    "stable cache hit"
                );
            }
            CacheEvent::StableMiss {
                session_id,
                signature,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    signature = %signature,
                    "stable cache miss"
                );
            }
            CacheEvent::Populated {
                session_id,
                signature,
                messages,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    signature = %signature,
                    messages,
                    "stable cache populated"
                );
            }
            CacheEvent::PopulateFailed {
                session_id,
                signature,
            } => {
                tracing::warn!(
                    session_id = %session_id,
                    signature = %signature,
                    "stable cache populate failed"
                );
            }
            CacheEvent::CacheError {
                operation,
                tenant,
                session_id,
                error,
            } => {
                tracing::warn!(
                    operation = %operation,
                    tenant = %tenant,
                    session_id = session_id.as_deref().unwrap_or("-"),
                    error = %error,
                    "cache error"
                );
            }
            CacheEvent::Invalidated {
                session_id,
                entries,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    entries,
                    "stable cache invalidated"
                );
            }
        }
    }
}
