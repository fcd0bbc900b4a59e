//! Incremental conversation history cache.
//!
//! Reads of the last `window` messages of a session are split into a
//! *stable* segment (everything but the newest `dynamic_count` messages),
//! served from a TTL cache keyed by a count-derived signature, and a
//! *dynamic* segment that is always read fresh from the [`MessageStore`].
//! Any other read goes straight to the message store.
//!
//! - [`IncrementalHistoryFetcher`]: the read path.
//! - [`InvalidationHook`]: clears a session's cached segments after a write.
//! - [`StableCache`]: wraps any [`CacheStore`] with timeouts and turns every
//!   cache failure into a miss or no-op.
//! - [`ConversationHistory`]: bundles the above with a write path.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use histcache_core::Role;
//! use histcache_history::{ConversationHistory, HistoryCacheConfig};
//! use histcache_memory::{InMemoryCacheStore, InMemoryMessageStore};
//!
//! # async fn example() -> Result<(), histcache_core::HistoryError> {
//! let history = ConversationHistory::builder(Arc::new(InMemoryMessageStore::new()))
//!     .cache(Arc::new(InMemoryCacheStore::new()))
//!     .config(HistoryCacheConfig::default())
//!     .build()?;
//!
//! history.save_message("session-1", Role::User, "hello").await?;
//! let recent = history.fetch_history("session-1", 40).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod fetcher;
mod history;
mod invalidation;
mod metrics;
mod stable_cache;

pub use config::HistoryCacheConfig;
pub use fetcher::{IncrementalHistoryFetcher, SegmentBounds};
pub use history::{ConversationHistory, ConversationHistoryBuilder};
pub use invalidation::InvalidationHook;
pub use metrics::{CountingMetrics, MetricsSnapshot, NoopMetrics, TracingMetrics};
pub use stable_cache::StableCache;

// Re-export core traits for convenience.
pub use histcache_core::{CacheStore, MessageStore, MetricsCollector};
