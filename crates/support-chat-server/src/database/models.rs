use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::services::conversation::types::{Faq, Message, MessageMetadata, ResponseSource, Session};

// Internal row types for SQLx mapping

#[derive(Debug, Clone, FromRow)]
pub struct ChatSessionRow {
    pub id: i64,
    pub session_token: String,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<ChatSessionRow> for Session {
    fn from(row: ChatSessionRow) -> Self {
        Session {
            id: row.id,
            token: row.session_token,
            user_id: row.user_id,
            started_at: row.started_at,
            ended_at: row.ended_at,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageRow {
    pub id: i64,
    pub chat_session_id: i64,
    pub content: String,
    pub is_from_user: bool,
    pub created_at: DateTime<Utc>,
    pub intent: Option<String>,
    pub confidence: Option<String>,
    pub response_source: Option<String>,
    pub related_faq_id: Option<i64>,
}

impl From<ChatMessageRow> for Message {
    fn from(row: ChatMessageRow) -> Self {
        let response_source = row.response_source.as_deref().and_then(|raw| {
            let parsed = ResponseSource::parse(raw);
            if parsed.is_none() {
                tracing::warn!("Unknown response_source '{}' on message {}", raw, row.id);
            }
            parsed
        });

        Message {
            id: row.id,
            session_id: row.chat_session_id,
            content: row.content,
            is_from_user: row.is_from_user,
            created_at: row.created_at,
            metadata: MessageMetadata {
                intent: row.intent,
                confidence: row.confidence,
                response_source,
                related_faq_id: row.related_faq_id,
            },
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct FaqRow {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub priority: i32,
    pub is_active: bool,
    pub view_count: i32,
}

impl From<FaqRow> for Faq {
    fn from(row: FaqRow) -> Self {
        Faq {
            id: row.id,
            question: row.question,
            answer: row.answer,
            category: row.category,
            tags: row.tags,
            priority: row.priority,
            is_active: row.is_active,
            view_count: row.view_count,
        }
    }
}
