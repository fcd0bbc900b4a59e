//! Redis integration for histcache.
//!
//! [`RedisCacheStore`] implements the [`CacheStore`](histcache_core::CacheStore)
//! trait. Each stable segment is stored as a JSON string under
//! `{prefix}{tenant}:{session_id}:{signature}` with a Redis-managed TTL, so
//! entries of one session can be dropped with a single `SCAN` + `DEL` pass.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use histcache_redis::{RedisCacheStore, RedisCacheStoreConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = RedisCacheStore::from_url("redis://127.0.0.1/")?;
//!
//! let config = RedisCacheStoreConfig { prefix: "bot:".to_string() };
//! let cache = RedisCacheStore::from_url_with_config("redis://127.0.0.1/", config)?;
//! # Ok(())
//! # }
//! ```

mod cache;

pub use cache::{RedisCacheStore, RedisCacheStoreConfig};

// Re-export core trait for convenience.
pub use histcache_core::CacheStore;
