//! In-memory backends for histcache.
//!
//! - [`InMemoryMessageStore`]: an append-only [`MessageStore`] keyed by session.
//! - [`InMemoryCacheStore`]: a [`CacheStore`] with per-key TTL expiration.
//!
//! Both are cheap to clone (shared state behind an `Arc`), which makes them
//! convenient for tests and single-process deployments.

mod cache;
mod messages;

pub use cache::InMemoryCacheStore;
pub use messages::InMemoryMessageStore;

pub use histcache_core::{CacheStore, MessageStore};
