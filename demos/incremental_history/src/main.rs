use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use histcache::core::{CacheKey, CacheStore, CachedSegment, HistoryError, Role};
use histcache::history::{ConversationHistory, CountingMetrics, HistoryCacheConfig};
use histcache::memory::InMemoryCacheStore;
use histcache::sqlite::SqliteMessageStore;
use tracing_subscriber::EnvFilter;

/// A cache backend that is always down.
struct UnreachableCache;

#[async_trait]
impl CacheStore for UnreachableCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CachedSegment>, HistoryError> {
        Err(HistoryError::Cache("connection refused".into()))
    }

    async fn put(
        &self,
        _key: &CacheKey,
        _segment: &CachedSegment,
        _ttl: Duration,
    ) -> Result<(), HistoryError> {
        Err(HistoryError::Cache("connection refused".into()))
    }

    async fn delete_by_session(
        &self,
        _tenant: &str,
        _session_id: &str,
    ) -> Result<usize, HistoryError> {
        Err(HistoryError::Cache("connection refused".into()))
    }

    async fn clear_tenant(&self, _tenant: &str) -> Result<usize, HistoryError> {
        Err(HistoryError::Cache("connection refused".into()))
    }

    async fn count_entries(&self, _tenant: &str) -> Result<usize, HistoryError> {
        Err(HistoryError::Cache("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        Err(HistoryError::Cache("connection refused".into()))
    }
}

async fn seed(history: &ConversationHistory, session: &str) -> Result<(), HistoryError> {
    history
        .save_message(session, Role::System, "You are a helpful assistant.")
        .await?;
    for turn in 0..25 {
        history
            .save_message(session, Role::User, &format!("Question {turn}"))
            .await?;
        history
            .save_message(session, Role::Assistant, &format!("Answer {turn}"))
            .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), HistoryError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let session = "demo-session";
    let store = Arc::new(SqliteMessageStore::in_memory()?);
    let metrics = CountingMetrics::new();
    let history = ConversationHistory::builder(store.clone())
        .cache(Arc::new(InMemoryCacheStore::new()))
        .config(HistoryCacheConfig::default())
        .metrics(Arc::new(metrics.clone()))
        .build()?;

    seed(&history, session).await?;
    println!("Seeded {} messages", history.message_count(session).await?);

    // --- First read: stable segment is computed and cached ---
    println!("\n=== Cache Miss (first read) ===");
    let first = history.fetch_window(session).await?;
    println!(
        "Returned {} messages: {} .. {}",
        first.len(),
        first[0].content(),
        first[first.len() - 1].content()
    );

    // --- Second read: stable segment comes from the cache ---
    println!("\n=== Cache Hit (same window) ===");
    let second = history.fetch_window(session).await?;
    println!("Same result: {}", first == second);

    // --- Append: the session's entries are dropped, next read recomputes ---
    println!("\n=== Append and Invalidate ===");
    history
        .save_message(session, Role::User, "One more question")
        .await?;
    println!("Cached entries after append: {}", history.cached_entries().await);
    let third = history.fetch_window(session).await?;
    println!("Newest message: {}", third[third.len() - 1].content());

    // --- Other limits bypass the cache ---
    println!("\n=== Direct Read (limit 5) ===");
    for message in history.fetch_history(session, 5).await? {
        println!("  [{}] {}: {}", message.position, message.role, message.content);
    }

    let snap = metrics.snapshot();
    println!(
        "\nhits={} misses={} direct={} invalidated={} hit_ratio={:?}",
        snap.hits,
        snap.misses,
        snap.direct_reads,
        snap.entries_invalidated,
        snap.hit_ratio()
    );

    // --- Cache outage: reads still succeed from the message store ---
    println!("\n=== Cache Outage ===");
    let degraded = ConversationHistory::builder(store)
        .cache(Arc::new(UnreachableCache))
        .build()?;
    println!("Cache available: {}", degraded.cache_available().await);
    let fallback = degraded.fetch_window(session).await?;
    println!(
        "Returned {} messages, identical to cached read: {}",
        fallback.len(),
        fallback == third
    );

    Ok(())
}
