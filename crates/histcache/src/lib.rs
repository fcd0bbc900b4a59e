//! Histcache: an incremental cache for the recent history of a conversation.
//!
//! This crate re-exports the histcache sub-crates for single-import usage.
//! Enable features to pick backends.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `history`, `memory` |
//! | `history` | `IncrementalHistoryFetcher`, `InvalidationHook`, `ConversationHistory` |
//! | `memory` | In-memory message store and cache store |
//! | `redis` | Redis cache store |
//! | `sqlite` | SQLite message store |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use histcache::core::{MessageStore, CacheStore, Role};
//! use histcache::history::{ConversationHistory, HistoryCacheConfig};
//! use histcache::memory::{InMemoryCacheStore, InMemoryMessageStore};
//! ```

/// Core traits and types: Message, MessageStore, CacheStore, stable_signature, HistoryError.
/// Always available.
pub use histcache_core as core;

/// Read path, invalidation hook, fault-tolerant cache wrapper and metrics collectors.
#[cfg(feature = "history")]
pub use histcache_history as history;

/// In-memory MessageStore and CacheStore.
#[cfg(feature = "memory")]
pub use histcache_memory as memory;

/// Redis-backed CacheStore.
#[cfg(feature = "redis")]
pub use histcache_redis as redis;

/// SQLite-backed MessageStore.
#[cfg(feature = "sqlite")]
pub use histcache_sqlite as sqlite;
