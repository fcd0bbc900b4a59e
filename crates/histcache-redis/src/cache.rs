use std::time::Duration;

use async_trait::async_trait;
use histcache_core::{CacheKey, CacheStore, CachedSegment, HistoryError};
use redis::AsyncCommands;

/// Configuration for [`RedisCacheStore`].
#[derive(Debug, Clone)]
pub struct RedisCacheStoreConfig {
    /// Key prefix for all cache entries. Defaults to `"histcache:"`.
    pub prefix: String,
}

impl Default for RedisCacheStoreConfig {
    fn default() -> Self {
        Self {
            prefix: "histcache:".to_string(),
        }
    }
}

/// Redis-backed implementation of the [`CacheStore`](histcache_core::CacheStore) trait.
///
/// Stores serialized [`CachedSegment`] values under
/// `{prefix}{tenant}:{session_id}:{signature}`, with `\` and `:` in the tenant
/// and session id escaped so a session's keys never share a prefix with
/// another session's. Expiry is handled by Redis itself (`SET ... EX`).
pub struct RedisCacheStore {
    client: redis::Client,
    config: RedisCacheStoreConfig,
}

impl RedisCacheStore {
    /// Create a new `RedisCacheStore` with an existing Redis client and configuration.
    pub fn new(client: redis::Client, config: RedisCacheStoreConfig) -> Self {
        Self { client, config }
    }

    /// Create a new `RedisCacheStore` from a Redis URL with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid. No connection is made until
    /// the first operation.
    pub fn from_url(url: &str) -> Result<Self, HistoryError> {
        Self::from_url_with_config(url, RedisCacheStoreConfig::default())
    }

    /// Create a new `RedisCacheStore` from a Redis URL with custom configuration.
    pub fn from_url_with_config(
        url: &str,
        config: RedisCacheStoreConfig,
    ) -> Result<Self, HistoryError> {
        let client = redis::Client::open(url)
            .map_err(|e| HistoryError::Cache(format!("failed to connect to Redis: {e}")))?;
        Ok(Self { client, config })
    }

    /// Build the full Redis key for a cache entry.
    fn redis_key(&self, key: &CacheKey) -> String {
        format!(
            "{}{}:{}:{}",
            self.config.prefix,
            escape_segment(&key.tenant),
            escape_segment(&key.session_id),
            key.signature
        )
    }

    /// SCAN pattern matching every entry of one session under a tenant.
    fn session_pattern(&self, tenant: &str, session_id: &str) -> String {
        format!(
            "{}{}:{}:*",
            escape_glob(&self.config.prefix),
            escape_glob(&escape_segment(tenant)),
            escape_glob(&escape_segment(session_id))
        )
    }

    /// SCAN pattern matching every entry under a tenant.
    fn tenant_pattern(&self, tenant: &str) -> String {
        format!(
            "{}{}:*",
            escape_glob(&self.config.prefix),
            escape_glob(&escape_segment(tenant))
        )
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, HistoryError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| HistoryError::Cache(format!("Redis connection error: {e}")))
    }
}

/// Escape the key separator inside a tenant or session id.
fn escape_segment(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, ':' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape Redis glob metacharacters so ids are matched literally.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Redis `EX` takes whole seconds; sub-second TTLs round up to one.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs.max(1)
    }
}

/// Collect all keys matching `pattern` via SCAN.
async fn scan_keys(
    con: &mut redis::aio::MultiplexedConnection,
    pattern: &str,
) -> Result<Vec<String>, HistoryError> {
    let mut keys: Vec<String> = Vec::new();
    let mut cursor: u64 = 0;
    loop {
        let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(100)
            .query_async(con)
            .await
            .map_err(|e| HistoryError::Cache(format!("Redis SCAN error: {e}")))?;

        keys.extend(batch);
        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }
    // SCAN may return a key more than once.
    keys.sort();
    keys.dedup();
    Ok(keys)
}

/// Delete all keys matching `pattern`, returning how many Redis removed.
async fn delete_matching(
    con: &mut redis::aio::MultiplexedConnection,
    pattern: &str,
) -> Result<usize, HistoryError> {
    let keys = scan_keys(con, pattern).await?;
    if keys.is_empty() {
        return Ok(0);
    }
    let mut removed = 0;
    for chunk in keys.chunks(500) {
        let n: usize = con
            .del(chunk)
            .await
            .map_err(|e| HistoryError::Cache(format!("Redis DEL error: {e}")))?;
        removed += n;
    }
    Ok(removed)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedSegment>, HistoryError> {
        let mut con = self.get_connection().await?;
        let redis_key = self.redis_key(key);

        let raw: Option<String> = con
            .get(&redis_key)
            .await
            .map_err(|e| HistoryError::Cache(format!("Redis GET error: {e}")))?;

        match raw {
            Some(json_str) => {
                let segment: CachedSegment = serde_json::from_str(&json_str).map_err(|e| {
                    HistoryError::Serialization(format!("JSON deserialize error: {e}"))
                })?;
                Ok(Some(segment))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &CacheKey,
        segment: &CachedSegment,
        ttl: Duration,
    ) -> Result<(), HistoryError> {
        let mut con = self.get_connection().await?;
        let redis_key = self.redis_key(key);

        let json_str = serde_json::to_string(segment)
            .map_err(|e| HistoryError::Serialization(format!("JSON serialize error: {e}")))?;

        con.set_ex::<_, _, ()>(&redis_key, &json_str, ttl_seconds(ttl))
            .await
            .map_err(|e| HistoryError::Cache(format!("Redis SET EX error: {e}")))?;

        tracing::trace!(key = %redis_key, ttl_secs = ttl_seconds(ttl), "stored stable segment");
        Ok(())
    }

    async fn delete_by_session(
        &self,
        tenant: &str,
        session_id: &str,
    ) -> Result<usize, HistoryError> {
        let mut con = self.get_connection().await?;
        let pattern = self.session_pattern(tenant, session_id);
        delete_matching(&mut con, &pattern).await
    }

    async fn clear_tenant(&self, tenant: &str) -> Result<usize, HistoryError> {
        let mut con = self.get_connection().await?;
        let pattern = self.tenant_pattern(tenant);
        delete_matching(&mut con, &pattern).await
    }

    async fn count_entries(&self, tenant: &str) -> Result<usize, HistoryError> {
        let mut con = self.get_connection().await?;
        let pattern = self.tenant_pattern(tenant);
        Ok(scan_keys(&mut con, &pattern).await?.len())
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        let mut con = self.get_connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut con)
            .await
            .map_err(|e| HistoryError::Cache(format!("Redis PING error: {e}")))?;
        Ok(())
    }
}
