use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use histcache_core::{CacheKey, CacheStore, CachedSegment, HistoryError};
use tokio::sync::RwLock;

struct CacheEntry {
    segment: CachedSegment,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory stable-segment cache with per-key TTL expiration.
///
/// Expired entries are never returned; they are dropped lazily by the
/// operations that walk the map (`delete_by_session`, `clear_tenant`,
/// `count_entries`, `purge_expired`).
#[derive(Default, Clone)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    async fn remove_where(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        entries.retain(|key, entry| {
            if entry.is_expired(now) {
                return false;
            }
            if matches(key) {
                removed += 1;
                return false;
            }
            true
        });
        removed
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedSegment>, HistoryError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Ok(Some(entry.segment.clone())),
            _ => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &CacheKey,
        segment: &CachedSegment,
        ttl: Duration,
    ) -> Result<(), HistoryError> {
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            HistoryError::Cache(format!("TTL of {}s is out of range", ttl.as_secs()))
        })?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key.clone(),
            CacheEntry {
                segment: segment.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete_by_session(
        &self,
        tenant: &str,
        session_id: &str,
    ) -> Result<usize, HistoryError> {
        Ok(self
            .remove_where(|key| key.tenant == tenant && key.session_id == session_id)
            .await)
    }

    async fn clear_tenant(&self, tenant: &str) -> Result<usize, HistoryError> {
        Ok(self.remove_where(|key| key.tenant == tenant).await)
    }

    async fn count_entries(&self, tenant: &str) -> Result<usize, HistoryError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| key.tenant == tenant && !entry.is_expired(now))
            .count())
    }
}
