#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use histcache_core::{
    CacheKey, CacheStore, CachedSegment, HistoryError, Message, MessageStore, Role,
};
use histcache_memory::{InMemoryCacheStore, InMemoryMessageStore};

pub const SESSION: &str = "session-1";

/// Message store pre-filled with `n` alternating user/assistant messages.
pub async fn seeded_store(session: &str, n: usize) -> InMemoryMessageStore {
    let store = InMemoryMessageStore::new();
    append_n(&store, session, 0, n).await;
    store
}

pub async fn append_n(store: &dyn MessageStore, session: &str, start: usize, n: usize) {
    for i in start..start + n {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        store.append(session, role, &format!("m{i}")).await.unwrap();
    }
}

pub fn contents(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.content.clone()).collect()
}

/// Which backend call a [`FaultyCacheStore`] should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub get: bool,
    pub put: bool,
    pub delete: bool,
    pub ping: bool,
}

impl Faults {
    pub fn all() -> Self {
        Self {
            get: true,
            put: true,
            delete: true,
            ping: true,
        }
    }
}

/// In-memory cache that counts calls and fails selected operations.
#[derive(Clone, Default)]
pub struct FaultyCacheStore {
    inner: InMemoryCacheStore,
    faults: Faults,
    pub gets: Arc<AtomicUsize>,
    pub puts: Arc<AtomicUsize>,
    pub deletes: Arc<AtomicUsize>,
}

impl FaultyCacheStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            faults,
            ..Default::default()
        }
    }

    pub fn healthy() -> Self {
        Self::new(Faults::default())
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryCacheStore {
        &self.inner
    }
}

fn down(op: &str) -> HistoryError {
    HistoryError::Cache(format!("connection refused during {op}"))
}

#[async_trait]
impl CacheStore for FaultyCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedSegment>, HistoryError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.faults.get {
            return Err(down("GET"));
        }
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &CacheKey,
        segment: &CachedSegment,
        ttl: Duration,
    ) -> Result<(), HistoryError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.faults.put {
            return Err(down("SET"));
        }
        self.inner.put(key, segment, ttl).await
    }

    async fn delete_by_session(
        &self,
        tenant: &str,
        session_id: &str,
    ) -> Result<usize, HistoryError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.faults.delete {
            return Err(down("DEL"));
        }
        self.inner.delete_by_session(tenant, session_id).await
    }

    async fn clear_tenant(&self, tenant: &str) -> Result<usize, HistoryError> {
        if self.faults.delete {
            return Err(down("DEL"));
        }
        self.inner.clear_tenant(tenant).await
    }

    async fn count_entries(&self, tenant: &str) -> Result<usize, HistoryError> {
        self.inner.count_entries(tenant).await
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        if self.faults.ping {
            return Err(down("PING"));
        }
        Ok(())
    }
}

/// Cache whose every operation hangs longer than any sane timeout.
#[derive(Clone, Default)]
pub struct HangingCacheStore;

#[async_trait]
impl CacheStore for HangingCacheStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CachedSegment>, HistoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn put(
        &self,
        _key: &CacheKey,
        _segment: &CachedSegment,
        _ttl: Duration,
    ) -> Result<(), HistoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn delete_by_session(
        &self,
        _tenant: &str,
        _session_id: &str,
    ) -> Result<usize, HistoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }

    async fn clear_tenant(&self, _tenant: &str) -> Result<usize, HistoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }

    async fn count_entries(&self, _tenant: &str) -> Result<usize, HistoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }
}

/// Message store that is down.
#[derive(Clone, Default)]
pub struct UnavailableMessageStore;

#[async_trait]
impl MessageStore for UnavailableMessageStore {
    async fn count_messages(&self, _session_id: &str) -> Result<usize, HistoryError> {
        Err(HistoryError::MessageStore("database unavailable".to_string()))
    }

    async fn read_messages(
        &self,
        _session_id: &str,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        Err(HistoryError::MessageStore("database unavailable".to_string()))
    }

    async fn append(
        &self,
        _session_id: &str,
        _role: Role,
        _content: &str,
    ) -> Result<Message, HistoryError> {
        Err(HistoryError::MessageStore("database unavailable".to_string()))
    }
}

/// Counts a session but fails every read; exercises errors after the count.
#[derive(Clone)]
pub struct FailingReadsMessageStore {
    pub total: usize,
}

#[async_trait]
impl MessageStore for FailingReadsMessageStore {
    async fn count_messages(&self, _session_id: &str) -> Result<usize, HistoryError> {
        Ok(self.total)
    }

    async fn read_messages(
        &self,
        _session_id: &str,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        Err(HistoryError::MessageStore("read timed out".to_string()))
    }

    async fn append(
        &self,
        _session_id: &str,
        _role: Role,
        _content: &str,
    ) -> Result<Message, HistoryError> {
        Err(HistoryError::MessageStore("read only".to_string()))
    }
}
