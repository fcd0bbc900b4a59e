use std::time::Duration;

use histcache_core::{CacheKey, CacheStore, CachedSegment, Message};
use histcache_memory::InMemoryCacheStore;

const TENANT: &str = "history_stable";
const DAY: Duration = Duration::from_secs(86_400);

fn segment(session: &str, n: usize) -> CachedSegment {
    let messages = (0..n).map(|i| Message::user(i as u64, format!("m{i}"))).collect();
    CachedSegment::new(session, n, n + 2, messages)
}

#[tokio::test]
async fn hit_after_put() {
    let cache = InMemoryCacheStore::new();
    let key = CacheKey::new(TENANT, "s1", "stable:1");
    cache.put(&key, &segment("s1", 3), DAY).await.unwrap();

    let hit = cache.get(&key).await.unwrap().unwrap();
    assert_eq!(hit.messages.len(), 3);
}

#[tokio::test]
async fn miss_on_unknown_key() {
    let cache = InMemoryCacheStore::new();
    let key = CacheKey::new(TENANT, "s1", "stable:nope");
    assert!(cache.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn ttl_expired() {
    let cache = InMemoryCacheStore::new();
    let key = CacheKey::new(TENANT, "s1", "stable:1");
    cache
        .put(&key, &segment("s1", 1), Duration::from_millis(50))
        .await
        .unwrap();
    assert!(cache.get(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(cache.get(&key).await.unwrap().is_none());
    assert_eq!(cache.count_entries(TENANT).await.unwrap(), 0);
    assert_eq!(cache.purge_expired().await, 1);
}

#[tokio::test]
async fn put_overwrites_same_key() {
    let cache = InMemoryCacheStore::new();
    let key = CacheKey::new(TENANT, "s1", "stable:1");
    cache.put(&key, &segment("s1", 1), DAY).await.unwrap();
    cache.put(&key, &segment("s1", 1), DAY).await.unwrap();
    assert_eq!(cache.count_entries(TENANT).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_by_session_only_touches_that_session() {
    let cache = InMemoryCacheStore::new();
    cache
        .put(&CacheKey::new(TENANT, "s1", "a"), &segment("s1", 1), DAY)
        .await
        .unwrap();
    cache
        .put(&CacheKey::new(TENANT, "s1", "b"), &segment("s1", 1), DAY)
        .await
        .unwrap();
    cache
        .put(&CacheKey::new(TENANT, "s2", "a"), &segment("s2", 1), DAY)
        .await
        .unwrap();
    cache
        .put(&CacheKey::new("other", "s1", "a"), &segment("s1", 1), DAY)
        .await
        .unwrap();

    assert_eq!(cache.delete_by_session(TENANT, "s1").await.unwrap(), 2);
    assert_eq!(cache.count_entries(TENANT).await.unwrap(), 1);
    assert_eq!(cache.count_entries("other").await.unwrap(), 1);
}

#[tokio::test]
async fn delete_by_session_with_no_entries_returns_zero() {
    let cache = InMemoryCacheStore::new();
    assert_eq!(cache.delete_by_session(TENANT, "s1").await.unwrap(), 0);
}

#[tokio::test]
async fn clear_tenant() {
    let cache = InMemoryCacheStore::new();
    for s in ["s1", "s2", "s3"] {
        cache
            .put(&CacheKey::new(TENANT, s, "sig"), &segment(s, 1), DAY)
            .await
            .unwrap();
    }
    cache
        .put(&CacheKey::new("keep", "s1", "sig"), &segment("s1", 1), DAY)
        .await
        .unwrap();

    assert_eq!(cache.clear_tenant(TENANT).await.unwrap(), 3);
    assert_eq!(cache.count_entries(TENANT).await.unwrap(), 0);
    assert_eq!(cache.count_entries("keep").await.unwrap(), 1);
}

#[tokio::test]
async fn clones_share_state() {
    let cache = InMemoryCacheStore::new();
    let clone = cache.clone();
    let key = CacheKey::new(TENANT, "s1", "sig");
    cache.put(&key, &segment("s1", 2), DAY).await.unwrap();
    assert!(clone.get(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn ping_defaults_to_ok() {
    let cache = InMemoryCacheStore::new();
    assert!(cache.ping().await.is_ok());
}

#[tokio::test]
async fn out_of_range_ttl_is_an_error() {
    let cache = InMemoryCacheStore::new();
    let key = CacheKey::new(TENANT, "s1", "stable:1");
    let result = cache
        .put(&key, &segment("s1", 3), Duration::from_secs(u64::MAX))
        .await;

    assert!(matches!(result, Err(histcache_core::HistoryError::Cache(_))));
    assert!(cache.get(&key).await.unwrap().is_none());
}
