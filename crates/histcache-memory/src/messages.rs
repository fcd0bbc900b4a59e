use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use histcache_core::{HistoryError, Message, MessageStore, Role};
use tokio::sync::RwLock;

/// In-memory implementation of `MessageStore`, storing messages keyed by session ID.
#[derive(Default, Clone)]
pub struct InMemoryMessageStore {
    sessions: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn count_messages(&self, session_id: &str) -> Result<usize, HistoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(Vec::len).unwrap_or(0))
    }

    async fn read_messages(
        &self,
        session_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        let sessions = self.sessions.read().await;
        let Some(messages) = sessions.get(session_id) else {
            return Ok(Vec::new());
        };
        Ok(messages.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn append(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, HistoryError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_default();
        let message = Message::new(session.len() as u64, role, content);
        session.push(message.clone());
        Ok(message)
    }
}
