use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use histcache_core::{now_unix, HistoryError, Message, MessageStore, Role};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed conversation message store.
///
/// Messages live in a single `histcache_messages` table keyed by
/// `(session_id, position)`; positions are assigned densely from 0 on append,
/// so offset reads map directly onto the primary key. Uses
/// `tokio::task::spawn_blocking` to avoid blocking the async runtime during
/// SQLite operations.
///
/// # Example
///
/// ```rust,no_run
/// use histcache_core::{MessageStore, Role};
/// use histcache_sqlite::SqliteMessageStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteMessageStore::in_memory()?;
/// store.append("session-1", Role::User, "hello").await?;
/// assert_eq!(store.count_messages("session-1").await?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqliteMessageStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMessageStore {
    /// Open (or create) a message store backed by a SQLite database file.
    pub fn new(path: impl AsRef<std::path::Path>) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)
            .map_err(|e| HistoryError::MessageStore(format!("SQLite open: {e}")))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS histcache_messages (
                session_id TEXT    NOT NULL,
                position   INTEGER NOT NULL,
                role       TEXT    NOT NULL,
                content    TEXT    NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (session_id, position)
            );",
        )
        .map_err(|e| HistoryError::MessageStore(format!("SQLite create tables: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, HistoryError> {
        Self::new(":memory:")
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, HistoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, HistoryError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| HistoryError::MessageStore(format!("Lock: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| HistoryError::MessageStore(format!("spawn_blocking: {e}")))?
    }
}

fn sql_i64(value: usize, what: &str) -> Result<i64, HistoryError> {
    i64::try_from(value)
        .map_err(|_| HistoryError::MessageStore(format!("{what} out of range: {value}")))
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn count_messages(&self, session_id: &str) -> Result<usize, HistoryError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM histcache_messages WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .map_err(|e| HistoryError::MessageStore(format!("SQLite COUNT: {e}")))?;
            Ok(count.max(0) as usize)
        })
        .await
    }

    async fn read_messages(
        &self,
        session_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let session_id = session_id.to_string();
        let offset = sql_i64(offset, "offset")?;
        let limit = sql_i64(limit, "limit")?;

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT position, role, content FROM histcache_messages \
                     WHERE session_id = ?1 \
                     ORDER BY position ASC \
                     LIMIT ?2 OFFSET ?3",
                )
                .map_err(|e| HistoryError::MessageStore(format!("SQLite prepare: {e}")))?;

            let rows = stmt
                .query_map(params![session_id, limit, offset], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| HistoryError::MessageStore(format!("SQLite query: {e}")))?;

            let mut messages = Vec::new();
            for row in rows {
                let (position, role, content) =
                    row.map_err(|e| HistoryError::MessageStore(format!("SQLite row: {e}")))?;
                let role = Role::from_str(&role)
                    .map_err(|e| HistoryError::MessageStore(format!("corrupt row: {e}")))?;
                messages.push(Message::new(position as u64, role, content));
            }
            Ok(messages)
        })
        .await
    }

    async fn append(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, HistoryError> {
        let session_id = session_id.to_string();
        let content = content.to_string();
        let now = now_unix() as i64;

        self.with_conn(move |conn| {
            // The connection mutex serializes appends, so MAX + 1 cannot race.
            let last: Option<i64> = conn
                .query_row(
                    "SELECT MAX(position) FROM histcache_messages WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .optional()
                .map_err(|e| HistoryError::MessageStore(format!("SQLite MAX: {e}")))?
                .flatten();
            let position = last.map_or(0, |p| p + 1);

            conn.execute(
                "INSERT INTO histcache_messages \
                 (session_id, position, role, content, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, position, role.as_str(), content, now],
            )
            .map_err(|e| HistoryError::MessageStore(format!("SQLite INSERT: {e}")))?;

            Ok(Message::new(position as u64, role, content))
        })
        .await
    }
}
