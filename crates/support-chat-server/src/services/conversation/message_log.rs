use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::store::MessageStore;
use super::types::{Message, MessageMetadata, NewMessage};

/// Append-only, per-session ordered record of exchanged messages
#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn MessageStore>,
}

impl MessageLog {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Write one message stamped with the current time
    pub async fn append(
        &self,
        session_id: i64,
        content: &str,
        is_from_user: bool,
        metadata: Option<MessageMetadata>,
    ) -> Result<Message> {
        let message = self
            .store
            .append_message(NewMessage {
                session_id,
                content: content.to_string(),
                is_from_user,
                created_at: Utc::now(),
                metadata: metadata.unwrap_or_default(),
            })
            .await?;

        debug!(
            "Appended {} message {} to session {}",
            if is_from_user { "user" } else { "agent" },
            message.id,
            session_id
        );
        Ok(message)
    }

    /// All messages of the session, oldest first, ties in write order
    pub async fn list_ordered(&self, session_id: i64) -> Result<Vec<Message>> {
        self.store
            .list_messages_by_session(session_id, false, None)
            .await
    }

    /// Up to `limit` most recent messages, newest first
    pub async fn recent(&self, session_id: i64, limit: usize) -> Result<Vec<Message>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.store
            .list_messages_by_session(session_id, true, Some(limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::services::conversation::store::SessionStore;
    use crate::services::conversation::types::{NewSession, ResponseSource};

    async fn log_with_session() -> (MessageLog, i64) {
        let store = Arc::new(InMemoryStore::new());
        let session = store
            .create_session(NewSession {
                token: "t".to_string(),
                user_id: 1,
                started_at: Utc::now(),
            })
            .await
            .unwrap();
        (MessageLog::new(store), session.id)
    }

    #[tokio::test]
    async fn test_list_ordered_reproduces_append_sequence() {
        let (log, session_id) = log_with_session().await;
        let bodies: Vec<String> = (0..12).map(|i| format!("message {i}")).collect();

        for (i, body) in bodies.iter().enumerate() {
            log.append(session_id, body, i % 2 == 0, None).await.unwrap();
        }

        let replay = log.list_ordered(session_id).await.unwrap();
        let replayed: Vec<&str> = replay.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(replayed, bodies.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(replay.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_metadata_is_optional() {
        let (log, session_id) = log_with_session().await;

        let user = log.append(session_id, "hi", true, None).await.unwrap();
        assert_eq!(user.metadata, MessageMetadata::default());

        let agent = log
            .append(
                session_id,
                "hello",
                false,
                Some(MessageMetadata::agent_turn(ResponseSource::Ai)),
            )
            .await
            .unwrap();
        assert_eq!(agent.metadata.response_source, Some(ResponseSource::Ai));
        assert_eq!(agent.metadata.intent.as_deref(), Some("general"));
    }

    #[tokio::test]
    async fn test_recent_returns_newest_first() {
        let (log, session_id) = log_with_session().await;
        for body in ["a", "b", "c"] {
            log.append(session_id, body, true, None).await.unwrap();
        }

        let recent = log.recent(session_id, 2).await.unwrap();
        let bodies: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_append_to_unknown_session_fails() {
        let (log, _) = log_with_session().await;
        assert!(log.append(999, "lost", true, None).await.is_err());
    }
}
