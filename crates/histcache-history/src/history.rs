use std::sync::Arc;

use histcache_core::{CacheStore, HistoryError, Message, MessageStore, MetricsCollector, Role};

use crate::config::HistoryCacheConfig;
use crate::fetcher::IncrementalHistoryFetcher;
use crate::invalidation::InvalidationHook;
use crate::metrics::NoopMetrics;
use crate::stable_cache::StableCache;

/// Conversation history with an incremental stable-segment cache.
///
/// Writes go to the message store and then invalidate the session's cached
/// segments; reads go through [`IncrementalHistoryFetcher`].
#[derive(Clone)]
pub struct ConversationHistory {
    messages: Arc<dyn MessageStore>,
    cache: Option<StableCache>,
    fetcher: IncrementalHistoryFetcher,
    invalidation: InvalidationHook,
}

impl ConversationHistory {
    pub fn builder(messages: Arc<dyn MessageStore>) -> ConversationHistoryBuilder {
        ConversationHistoryBuilder::new(messages)
    }

    /// Append a message and invalidate the session's cached segments.
    ///
    /// Only a message store failure fails the call; invalidation problems are
    /// logged and ignored because the write is already committed.
    pub async fn save_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, HistoryError> {
        let message = self.messages.append(session_id, role, content).await?;
        tracing::debug!(session_id, position = message.position, role = %role, "message saved");
        self.invalidation.on_message_appended(session_id).await;
        Ok(message)
    }

    /// The most recent `limit_count` messages, oldest first.
    pub async fn fetch_history(
        &self,
        session_id: &str,
        limit_count: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        self.fetcher.fetch_history(session_id, limit_count).await
    }

    /// Fetch using the configured cache window.
    pub async fn fetch_window(&self, session_id: &str) -> Result<Vec<Message>, HistoryError> {
        self.fetch_history(session_id, self.fetcher.config().window).await
    }

    pub async fn message_count(&self, session_id: &str) -> Result<usize, HistoryError> {
        self.messages.count_messages(session_id).await
    }

    /// Whether the cache backend is configured and reachable.
    pub async fn cache_available(&self) -> bool {
        match &self.cache {
            Some(cache) => cache.is_available().await,
            None => false,
        }
    }

    /// Live stable-segment entries in the configured tenant (0 without a cache).
    pub async fn cached_entries(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.count_entries(&self.fetcher.config().tenant).await,
            None => 0,
        }
    }

    /// Drop every cached stable segment in the configured tenant.
    pub async fn clear_cache(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.clear_tenant(&self.fetcher.config().tenant).await,
            None => 0,
        }
    }

    pub fn fetcher(&self) -> &IncrementalHistoryFetcher {
        &self.fetcher
    }

    pub fn invalidation(&self) -> &InvalidationHook {
        &self.invalidation
    }
}

/// Builder for [`ConversationHistory`].
pub struct ConversationHistoryBuilder {
    messages: Arc<dyn MessageStore>,
    cache: Option<Arc<dyn CacheStore>>,
    config: HistoryCacheConfig,
    metrics: Arc<dyn MetricsCollector>,
}

impl ConversationHistoryBuilder {
    pub fn new(messages: Arc<dyn MessageStore>) -> Self {
        Self {
            messages,
            cache: None,
            config: HistoryCacheConfig::default(),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(mut self, config: HistoryCacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Validate the configuration and wire the components together.
    pub fn build(self) -> Result<ConversationHistory, HistoryError> {
        let cache = self.cache.map(|store| {
            StableCache::new(store)
                .with_timeout(self.config.op_timeout())
                .with_metrics(Arc::clone(&self.metrics))
        });

        let fetcher = IncrementalHistoryFetcher::new(
            Arc::clone(&self.messages),
            cache.clone(),
            self.config.clone(),
        )?
        .with_metrics(Arc::clone(&self.metrics));

        let invalidation = InvalidationHook::new(cache.clone(), self.config.tenant.clone())
            .with_metrics(Arc::clone(&self.metrics));

        Ok(ConversationHistory {
            messages: self.messages,
            cache,
            fetcher,
            invalidation,
        })
    }
}
