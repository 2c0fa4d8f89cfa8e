use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::models::{ChatMessageRow, ChatSessionRow, FaqRow};
use super::DbPool;
use crate::services::conversation::store::{FaqStore, MessageStore, SessionStore, StoreHealth};
use crate::services::conversation::types::{
    Faq, Message, NewMessage, NewSession, Session, UserId,
};

const SESSION_COLUMNS: &str = "id, session_token, user_id, started_at, ended_at, is_active";

const MESSAGE_COLUMNS: &str = "id, chat_session_id, content, is_from_user, created_at, \
     intent, confidence, response_source, related_faq_id";

const FAQ_COLUMNS: &str =
    "id, question, answer, category, tags, priority, is_active, view_count";

/// Postgres-backed store for sessions, messages and FAQs
pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for Repository {
    async fn find_session_by_token_and_user(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE session_token = $1 AND user_id = $2"
        ))
        .bind(token)
        .bind(user_id)
        .fetch_optional(self.pool.get_pool())
        .await
        .context("Failed to look up chat session")?;

        Ok(row.map(Session::from))
    }

    async fn create_session(&self, session: NewSession) -> Result<Session> {
        let row = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "INSERT INTO chat_sessions (session_token, user_id, started_at, ended_at, is_active) \
             VALUES ($1, $2, $3, NULL, TRUE) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.started_at)
        .fetch_one(self.pool.get_pool())
        .await
        .context("Failed to create chat session")?;

        debug!("Created chat session {} for user {}", row.id, row.user_id);
        Ok(row.into())
    }

    async fn update_session(&self, session: &Session) -> Result<Session> {
        let row = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "UPDATE chat_sessions SET is_active = $2, ended_at = $3 \
             WHERE id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.id)
        .bind(session.is_active)
        .bind(session.ended_at)
        .fetch_one(self.pool.get_pool())
        .await
        .context("Failed to update chat session")?;

        Ok(row.into())
    }

    async fn list_sessions_by_user(&self, user_id: UserId) -> Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE user_id = $1 \
             ORDER BY started_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool.get_pool())
        .await
        .context("Failed to list chat sessions")?;

        Ok(rows.into_iter().map(Session::from).collect())
    }
}

#[async_trait]
impl MessageStore for Repository {
    async fn append_message(&self, message: NewMessage) -> Result<Message> {
        let source = message.metadata.response_source.map(|s| s.as_str());

        let row = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "INSERT INTO chat_messages \
               (chat_session_id, content, is_from_user, created_at, \
                intent, confidence, response_source, related_faq_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message.session_id)
        .bind(&message.content)
        .bind(message.is_from_user)
        .bind(message.created_at)
        .bind(message.metadata.intent.as_deref())
        .bind(message.metadata.confidence.as_deref())
        .bind(source)
        .bind(message.metadata.related_faq_id)
        .fetch_one(self.pool.get_pool())
        .await
        .context("Failed to append chat message")?;

        Ok(row.into())
    }

    async fn list_messages_by_session(
        &self,
        session_id: i64,
        most_recent_first: bool,
        limit: Option<i64>,
    ) -> Result<Vec<Message>> {
        let order = if most_recent_first {
            "created_at DESC, id DESC"
        } else {
            "created_at ASC, id ASC"
        };

        // LIMIT NULL is LIMIT ALL in Postgres
        let rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE chat_session_id = $1 \
             ORDER BY {order} \
             LIMIT $2"
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(self.pool.get_pool())
        .await
        .context("Failed to list chat messages")?;

        debug!("Loaded {} messages for session {}", rows.len(), session_id);
        Ok(rows.into_iter().map(Message::from).collect())
    }
}

#[async_trait]
impl FaqStore for Repository {
    async fn list_active_faqs(&self, category: Option<String>) -> Result<Vec<Faq>> {
        let rows = sqlx::query_as::<_, FaqRow>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs \
             WHERE is_active = TRUE AND ($1::text IS NULL OR category = $1::text) \
             ORDER BY priority ASC, question ASC"
        ))
        .bind(category)
        .fetch_all(self.pool.get_pool())
        .await
        .context("Failed to list FAQs")?;

        Ok(rows.into_iter().map(Faq::from).collect())
    }

    async fn find_faq_by_id(&self, id: i64) -> Result<Option<Faq>> {
        let row = sqlx::query_as::<_, FaqRow>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await
        .context("Failed to look up FAQ")?;

        Ok(row.map(Faq::from))
    }
}

#[async_trait]
impl StoreHealth for Repository {
    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.get_pool())
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
