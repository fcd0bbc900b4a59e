use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Author of a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(HistoryError::Serialization(format!(
                "unknown message role: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single conversation message. Immutable once written.
///
/// `position` is the 0-based creation index of the message within its
/// session, assigned by the [`MessageStore`] on append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub position: u64,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(position: u64, role: Role, content: impl Into<String>) -> Self {
        Self {
            position,
            role,
            content: content.into(),
        }
    }

    pub fn system(position: u64, content: impl Into<String>) -> Self {
        Self::new(position, Role::System, content)
    }

    pub fn user(position: u64, content: impl Into<String>) -> Self {
        Self::new(position, Role::User, content)
    }

    pub fn assistant(position: u64, content: impl Into<String>) -> Self {
        Self::new(position, Role::Assistant, content)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

// ---------------------------------------------------------------------------
// HistoryError
// ---------------------------------------------------------------------------

/// Unified error type for histcache operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("message store error: {0}")]
    MessageStore(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("config error: {0}")]
    Config(String),
}

impl HistoryError {
    /// Whether the error originates from the cache side and may be absorbed
    /// as a miss or no-op.
    pub fn is_cache_fault(&self) -> bool {
        matches!(
            self,
            HistoryError::Cache(_) | HistoryError::Timeout(_) | HistoryError::Serialization(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Signature generator
// ---------------------------------------------------------------------------

/// Prefix carried by every stable-segment signature.
pub const STABLE_SIGNATURE_PREFIX: &str = "stable";

/// Number of hex characters kept from the digest (128 bits).
const SIGNATURE_HEX_LEN: usize = 32;

/// Field separator used when hashing signature inputs (ASCII unit separator).
const SIGNATURE_DELIMITER: &[u8] = b"\x1f";

/// Deterministic cache key for the stable segment of a session.
///
/// The digest covers `session_id`, `stable_count` and `total_count`, so any
/// change in the session's message count yields a different signature and
/// older entries become unreachable.
pub fn stable_signature(session_id: &str, stable_count: usize, total_count: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(SIGNATURE_DELIMITER);
    hasher.update(stable_count.to_string().as_bytes());
    hasher.update(SIGNATURE_DELIMITER);
    hasher.update(total_count.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{STABLE_SIGNATURE_PREFIX}:{}", &digest[..SIGNATURE_HEX_LEN])
}

// ---------------------------------------------------------------------------
// Cache key and cached value
// ---------------------------------------------------------------------------

/// Address of a cache entry: tenant namespace, owning session and signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tenant: String,
    pub session_id: String,
    pub signature: String,
}

impl CacheKey {
    pub fn new(
        tenant: impl Into<String>,
        session_id: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            session_id: session_id.into(),
            signature: signature.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tenant, self.session_id, self.signature)
    }
}

/// The value stored under a [`CacheKey`]: an ordered stable segment plus the
/// boundary it was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSegment {
    pub session_id: String,
    pub stable_count: usize,
    pub total_count: usize,
    pub messages: Vec<Message>,
    /// Unix timestamp (seconds) at which the segment was cached.
    pub created_at: u64,
}

impl CachedSegment {
    pub fn new(
        session_id: impl Into<String>,
        stable_count: usize,
        total_count: usize,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            stable_count,
            total_count,
            messages,
            created_at: now_unix(),
        }
    }

    /// Time elapsed since the segment was cached.
    pub fn age(&self) -> Duration {
        Duration::from_secs(now_unix().saturating_sub(self.created_at))
    }
}

/// Current Unix time in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// MessageStore
// ---------------------------------------------------------------------------

/// Authoritative, append-only message storage keyed by session ID.
///
/// Errors returned here are never absorbed by the cache layer.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Total messages currently stored for the session.
    async fn count_messages(&self, session_id: &str) -> Result<usize, HistoryError>;

    /// Messages in creation order starting at `offset`, at most `limit` items.
    /// Returns an empty list when `offset` is past the end.
    async fn read_messages(
        &self,
        session_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, HistoryError>;

    /// Append a message, assigning it the next position in the session.
    async fn append(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, HistoryError>;
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// Key-value storage with per-key TTL used for stable segments.
///
/// Implementations report backend failures as errors; the fault-tolerant
/// wrapper in `histcache-history` turns them into misses and no-ops.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a cached segment.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedSegment>, HistoryError>;

    /// Store a segment that expires after `ttl`.
    async fn put(
        &self,
        key: &CacheKey,
        segment: &CachedSegment,
        ttl: Duration,
    ) -> Result<(), HistoryError>;

    /// Remove every entry of `session_id` under `tenant`, returning how many
    /// were removed. Zero matching entries is not an error.
    async fn delete_by_session(&self, tenant: &str, session_id: &str)
        -> Result<usize, HistoryError>;

    /// Remove every entry under `tenant`.
    async fn clear_tenant(&self, tenant: &str) -> Result<usize, HistoryError>;

    /// Number of live entries under `tenant`.
    async fn count_entries(&self, tenant: &str) -> Result<usize, HistoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), HistoryError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Why a fetch bypassed the stable cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectReason {
    /// No cache configured, or caching switched off.
    CacheDisabled,
    /// Requested limit differs from the cache window.
    LimitMismatch,
    /// The session is too short to form a stable segment.
    TooFewMessages,
}

/// Cache operation that failed and was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    Get,
    Put,
    DeleteBySession,
    ClearTenant,
    CountEntries,
    Ping,
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheOperation::Get => "get",
            CacheOperation::Put => "put",
            CacheOperation::DeleteBySession => "delete_by_session",
            CacheOperation::ClearTenant => "clear_tenant",
            CacheOperation::CountEntries => "count_entries",
            CacheOperation::Ping => "ping",
        };
        f.write_str(name)
    }
}

/// Events emitted by the history cache for metrics collectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    DirectRead {
        session_id: String,
        reason: DirectReason,
        returned: usize,
    },
    StableHit {
        session_id: String,
        signature: String,
        messages: usize,
    },
    StableMiss {
        session_id: String,
        signature: String,
    },
    Populated {
        session_id: String,
        signature: String,
        messages: usize,
    },
    PopulateFailed {
        session_id: String,
        signature: String,
    },
    CacheError {
        operation: CacheOperation,
        tenant: String,
        session_id: Option<String>,
        error: String,
    },
    Invalidated {
        session_id: String,
        entries: usize,
    },
}

/// Receives [`CacheEvent`]s. Passed explicitly to the components that emit
/// them so each caller (or test) owns its collector.
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    async fn on_event(&self, event: CacheEvent);
}
