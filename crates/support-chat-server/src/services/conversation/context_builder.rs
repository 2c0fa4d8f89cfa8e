use tracing::{debug, warn};

use super::message_log::MessageLog;

/// Number of most recent messages folded into the prompt context
pub const CONTEXT_WINDOW_MESSAGES: usize = 5;

/// Derives the prompt context for a session from its recent history
#[derive(Clone)]
pub struct ContextBuilder {
    log: MessageLog,
    window: usize,
}

impl ContextBuilder {
    pub fn new(log: MessageLog) -> Self {
        Self {
            log,
            window: CONTEXT_WINDOW_MESSAGES,
        }
    }

    /// Bodies of the last few messages, oldest first, joined by a single space.
    ///
    /// Returns an empty string when the session has no messages or the
    /// history cannot be read.
    pub async fn build_context(&self, session_id: i64) -> String {
        let mut recent = match self.log.recent(session_id, self.window).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Could not read history for session {}: {:#}", session_id, e);
                return String::new();
            }
        };

        recent.reverse();
        let context = recent
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        debug!(
            "Built context for session {} from {} messages ({} chars)",
            session_id,
            recent.len(),
            context.len()
        );
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::services::conversation::store::{MockMessageStore, SessionStore};
    use crate::services::conversation::types::NewSession;
    use chrono::Utc;
    use std::sync::Arc;

    async fn setup() -> (MessageLog, i64) {
        let store = Arc::new(InMemoryStore::new());
        let session = store
            .create_session(NewSession {
                token: "ctx".to_string(),
                user_id: 1,
                started_at: Utc::now(),
            })
            .await
            .unwrap();
        (MessageLog::new(store), session.id)
    }

    #[tokio::test]
    async fn test_empty_session_yields_empty_context() {
        let (log, session_id) = setup().await;
        let builder = ContextBuilder::new(log);

        assert_eq!(builder.build_context(session_id).await, "");
    }

    #[tokio::test]
    async fn test_context_is_chronological_and_space_joined() {
        let (log, session_id) = setup().await;
        log.append(session_id, "How do I track my order?", true, None).await.unwrap();
        log.append(session_id, "Use Order History.", false, None).await.unwrap();

        let builder = ContextBuilder::new(log);
        assert_eq!(
            builder.build_context(session_id).await,
            "How do I track my order? Use Order History."
        );
    }

    #[tokio::test]
    async fn test_context_covers_only_last_five_messages() {
        let (log, session_id) = setup().await;
        for i in 1..=8 {
            log.append(session_id, &format!("m{i}"), i % 2 == 1, None).await.unwrap();
        }

        let builder = ContextBuilder::new(log);
        assert_eq!(builder.build_context(session_id).await, "m4 m5 m6 m7 m8");
    }

    #[tokio::test]
    async fn test_bodies_are_not_truncated() {
        let (log, session_id) = setup().await;
        let long = "x".repeat(10_000);
        log.append(session_id, &long, true, None).await.unwrap();

        let builder = ContextBuilder::new(log);
        assert_eq!(builder.build_context(session_id).await.len(), 10_000);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty() {
        let mut store = MockMessageStore::new();
        store
            .expect_list_messages_by_session()
            .returning(|_, _, _| Err(anyhow::anyhow!("connection reset")));

        let builder = ContextBuilder::new(MessageLog::new(Arc::new(store)));
        assert_eq!(builder.build_context(1).await, "");
    }
}
