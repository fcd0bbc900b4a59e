//! SQLite integration for histcache.
//!
//! [`SqliteMessageStore`] is a relational, append-only implementation of the
//! [`MessageStore`](histcache_core::MessageStore) trait: the source of truth
//! the stable-segment cache sits in front of.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use histcache_sqlite::SqliteMessageStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-based (persists across restarts)
//! let store = SqliteMessageStore::new("/var/lib/bot/messages.db")?;
//!
//! // In-memory (for testing)
//! let store = SqliteMessageStore::in_memory()?;
//! # Ok(())
//! # }
//! ```

mod messages;

pub use messages::SqliteMessageStore;

// Re-export core trait for convenience.
pub use histcache_core::MessageStore;
